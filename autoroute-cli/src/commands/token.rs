//! Implementation of the `autoroute token` command.

use autoroute::prelude::{AuthConfig, load_dotenv};

/// Every permission the catalog declares.
pub const CATALOG_PERMISSIONS: &[&str] = &[
    "Products.Read",
    "Products.Create",
    "Products.Update",
    "Products.Delete",
];

pub struct TokenConfig {
    pub subject: String,
    pub permissions: Vec<String>,
    /// Grant every catalog permission.
    pub all: bool,
}

/// Prints a development token signed with `JWT_SECRET`.
pub fn execute(config: TokenConfig) -> Result<(), String> {
    load_dotenv();
    let auth = AuthConfig::from_env().map_err(|e| e.to_string())?;

    let permissions = if config.all {
        CATALOG_PERMISSIONS.iter().map(|p| p.to_string()).collect()
    } else {
        config.permissions
    };

    let token = auth
        .create_token_with(&config.subject, Vec::new(), permissions)
        .map_err(|e| e.to_string())?;
    println!("{}", token);
    Ok(())
}
