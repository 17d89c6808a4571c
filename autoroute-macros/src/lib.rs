use heck::ToUpperCamelCase;
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::spanned::Spanned;
use syn::{
    Attribute, Error, FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, Pat, ReturnType, Type,
    Visibility, parse_macro_input,
};

/// Exposes the public `async` methods of an application service.
///
/// ```ignore
/// #[app_service]
/// impl ProductAppService {
///     #[permission("Products.Read")]
///     pub async fn get_async(&self, id: Uuid, ct: CancellationToken) -> Result<Option<ProductDto>> { .. }
///
///     #[endpoint(verb = "PUT", path = "archive", permission = "Products.Update")]
///     pub async fn archive_async(&self, id: Uuid, ct: CancellationToken) -> Result<()> { .. }
///
///     #[endpoint(skip)]
///     pub async fn reindex(&self) { .. }
/// }
/// ```
///
/// Generates the `Operations` table for the type and registers it for
/// discovery. The type name is used as the service identity; override it
/// with `#[app_service(name = "...")]`.
#[proc_macro_attribute]
pub fn app_service(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ServiceArgs);
    let item = parse_macro_input!(item as ItemImpl);
    expand_app_service(args, item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

#[derive(Default)]
struct ServiceArgs {
    name: Option<LitStr>,
}

impl syn::parse::Parse for ServiceArgs {
    fn parse(input: syn::parse::ParseStream<'_>) -> syn::Result<Self> {
        let mut args = ServiceArgs::default();
        if input.is_empty() {
            return Ok(args);
        }
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("name") {
                args.name = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        });
        syn::parse::Parser::parse2(parser, input.parse()?)?;
        Ok(args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Cancellation,
    Identifier,
    Payload,
}

#[derive(Default)]
struct EndpointArgs {
    verb: Option<LitStr>,
    path: Option<LitStr>,
    permission: Option<LitStr>,
    skip: bool,
}

fn expand_app_service(args: ServiceArgs, mut item: ItemImpl) -> Result<TokenStream2, Error> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new_spanned(
            path,
            "#[app_service] goes on an inherent impl block, not a trait impl",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &item.generics,
            "#[app_service] does not support generic services",
        ));
    }

    let self_ty = item.self_ty.clone();
    let type_name = match args.name {
        Some(name) => name.value(),
        None => type_ident(&self_ty)?,
    };

    let mut operations = Vec::new();
    for impl_item in item.items.iter_mut() {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let endpoint = take_endpoint_args(&mut method.attrs)?;
        if endpoint.skip || !matches!(method.vis, Visibility::Public(_)) {
            continue;
        }
        if let Some(operation) = expand_operation(method, &endpoint)? {
            operations.push(operation);
        }
    }

    Ok(quote! {
        #item

        impl ::autoroute::endpoint::Operations for #self_ty {
            const TYPE_NAME: &'static str = #type_name;

            fn operations() -> ::std::vec::Vec<::autoroute::endpoint::Operation<Self>> {
                ::std::vec![#(#operations),*]
            }
        }

        ::autoroute::inventory::submit! {
            ::autoroute::discovery::ServiceRegistration {
                type_name: #type_name,
                register: ::autoroute::discovery::register::<#self_ty>,
            }
        }
    })
}

/// Builds one `Operation` constructor call, or `None` for associated
/// functions without a receiver.
fn expand_operation(
    method: &ImplItemFn,
    endpoint: &EndpointArgs,
) -> Result<Option<TokenStream2>, Error> {
    let sig = &method.sig;
    let Some(FnArg::Receiver(receiver)) = sig.inputs.first() else {
        return Ok(None);
    };
    if receiver.reference.is_none() || receiver.mutability.is_some() {
        return Err(Error::new_spanned(
            receiver,
            "application service methods take `&self`",
        ));
    }
    if sig.asyncness.is_none() {
        return Err(Error::new_spanned(
            sig.fn_token,
            "application service methods must be `async`",
        ));
    }
    if let ReturnType::Default = sig.output {
        return Err(Error::new_spanned(
            sig,
            "application service methods return `Result<T, E>`",
        ));
    }

    let ident = &sig.ident;
    let identity = method_identity(&ident.to_string());

    let mut params = Vec::new();
    for arg in sig.inputs.iter().skip(1) {
        let FnArg::Typed(pat_type) = arg else {
            continue;
        };
        let name = match &*pat_type.pat {
            Pat::Ident(pat) => pat.ident.to_string().trim_start_matches('_').to_string(),
            other => return Err(Error::new_spanned(other, "expected a named parameter")),
        };
        params.push((name, classify(&pat_type.ty)?, (*pat_type.ty).clone()));
    }

    let kinds: Vec<Kind> = params.iter().map(|(_, kind, _)| *kind).collect();
    let (constructor, closure_args, call_args) = match kinds.as_slice() {
        [Kind::Cancellation] => (
            quote!(no_args),
            quote!(ct: ::autoroute::CancellationToken),
            quote!(ct),
        ),
        [Kind::Identifier, Kind::Cancellation] => (
            quote!(id_only),
            quote!(id: ::autoroute::uuid::Uuid, ct: ::autoroute::CancellationToken),
            quote!(id, ct),
        ),
        [Kind::Payload, Kind::Cancellation] => {
            let body_ty = &params[0].2;
            (
                quote!(body_only),
                quote!(body: #body_ty, ct: ::autoroute::CancellationToken),
                quote!(body, ct),
            )
        }
        [Kind::Identifier, Kind::Payload, Kind::Cancellation] => {
            let body_ty = &params[1].2;
            (
                quote!(id_and_body),
                quote!(id: ::autoroute::uuid::Uuid, body: #body_ty, ct: ::autoroute::CancellationToken),
                quote!(id, body, ct),
            )
        }
        _ => {
            return Err(Error::new(
                sig.inputs.span(),
                "unsupported parameter shape; expected one of `(ct)`, `(id: Uuid, ct)`, \
                 `(body, ct)` or `(id: Uuid, body, ct)` where `ct: CancellationToken`",
            ));
        }
    };

    let param_calls = params.iter().map(|(name, kind, _)| {
        let kind = match kind {
            Kind::Cancellation => quote!(Cancellation),
            Kind::Identifier => quote!(Identifier),
            Kind::Payload => quote!(Payload),
        };
        quote!(.param(#name, ::autoroute::endpoint::ParamKind::#kind))
    });

    let mut modifiers = Vec::new();
    if let Some(permission) = &endpoint.permission {
        modifiers.push(quote!(.permission(#permission)));
    }
    if let Some(verb) = &endpoint.verb {
        let variant = verb_variant(verb)?;
        modifiers.push(quote!(.verb(::autoroute::endpoint::HttpVerb::#variant)));
    }
    if let Some(path) = &endpoint.path {
        modifiers.push(quote!(.path(#path)));
    }

    Ok(Some(quote! {
        ::autoroute::endpoint::Operation::#constructor(
            ::autoroute::endpoint::MethodDescriptor::new(#identity)
                #(#param_calls)*
                #(#modifiers)*,
            |service: ::std::sync::Arc<Self>, #closure_args| async move {
                service.#ident(#call_args).await.map_err(::autoroute::Error::from)
            },
        )
    }))
}

/// Removes `#[permission(..)]` and `#[endpoint(..)]` from a method and
/// returns what they declared.
fn take_endpoint_args(attrs: &mut Vec<Attribute>) -> Result<EndpointArgs, Error> {
    let mut args = EndpointArgs::default();
    let mut kept = Vec::with_capacity(attrs.len());

    for attr in attrs.drain(..) {
        if attr.path().is_ident("permission") {
            args.permission = Some(attr.parse_args::<LitStr>()?);
        } else if attr.path().is_ident("endpoint") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("verb") {
                    args.verb = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("path") {
                    args.path = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("permission") {
                    args.permission = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("skip") {
                    args.skip = true;
                } else {
                    return Err(meta.error("expected `verb`, `path`, `permission` or `skip`"));
                }
                Ok(())
            })?;
        } else {
            kept.push(attr);
        }
    }

    *attrs = kept;
    Ok(args)
}

fn verb_variant(verb: &LitStr) -> Result<proc_macro2::Ident, Error> {
    let variant = match verb.value().to_ascii_uppercase().as_str() {
        "GET" => "Get",
        "POST" => "Post",
        "PUT" => "Put",
        "DELETE" => "Delete",
        _ => {
            return Err(Error::new_spanned(
                verb,
                "verb must be one of GET, POST, PUT, DELETE",
            ));
        }
    };
    Ok(proc_macro2::Ident::new(variant, Span::call_site()))
}

/// `get_all_async` -> `GetAllAsync`.
fn method_identity(name: &str) -> String {
    name.to_upper_camel_case()
}

fn type_ident(ty: &Type) -> Result<String, Error> {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .ok_or_else(|| Error::new_spanned(ty, "expected a named type")),
        other => Err(Error::new_spanned(other, "expected a named type")),
    }
}

fn classify(ty: &Type) -> Result<Kind, Error> {
    match ty {
        Type::Path(path) => {
            let last = path.path.segments.last().map(|s| s.ident.to_string());
            Ok(match last.as_deref() {
                Some("CancellationToken") => Kind::Cancellation,
                Some("Uuid") => Kind::Identifier,
                _ => Kind::Payload,
            })
        }
        Type::Reference(_) => Err(Error::new_spanned(
            ty,
            "parameters are passed by value; use an owned type",
        )),
        _ => Ok(Kind::Payload),
    }
}
