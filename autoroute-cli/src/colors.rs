use colored::{ColoredString, Colorize, CustomColor};

/// Catppuccin Mocha color palette.
pub fn mauve() -> CustomColor {
    CustomColor::new(203, 166, 247)
}

pub fn subtext() -> CustomColor {
    CustomColor::new(166, 173, 200)
}

pub fn green() -> CustomColor {
    CustomColor::new(166, 227, 161)
}

pub fn yellow() -> CustomColor {
    CustomColor::new(249, 226, 175)
}

pub fn red() -> CustomColor {
    CustomColor::new(243, 139, 168)
}

pub fn blue() -> CustomColor {
    CustomColor::new(137, 180, 250)
}

/// An HTTP method, padded to a fixed width and colored by verb.
pub fn verb(method: &str) -> ColoredString {
    let color = match method {
        "GET" => green(),
        "POST" => blue(),
        "PUT" => yellow(),
        "DELETE" => red(),
        _ => subtext(),
    };
    format!("{:<7}", method).custom_color(color).bold()
}
