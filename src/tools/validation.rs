//! Input validation shared by the tool implementations

/// Trimmed, non-empty text
pub fn required_text(value: &str, field: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    Ok(trimmed.to_string())
}

/// Lower-case URL slug made of `[a-z0-9-]`, no leading/trailing dash
pub fn slug(value: &str) -> Result<String, String> {
    let slug = value.trim().to_lowercase();
    if slug.is_empty() {
        return Err("slug cannot be empty".to_string());
    }
    if !slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err(format!("Invalid slug '{}': use a-z, 0-9 and '-'", slug));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(format!("Invalid slug '{}': cannot start or end with '-'", slug));
    }
    Ok(slug)
}

/// Derive a slug from a display name ("Basmati Rice 1121" -> "basmati-rice-1121")
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

pub fn positive_factor(value: f64, field: &str) -> Result<f64, String> {
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{} must be a positive number", field));
    }
    Ok(value)
}

pub fn non_negative(value: f64, field: &str) -> Result<f64, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} cannot be negative", field));
    }
    Ok(value)
}

/// Minimal shape check: something@domain.tld
pub fn email(value: &str) -> Result<String, String> {
    let email = value.trim().to_string();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(format!("Invalid email address: '{}'", email));
    }
    Ok(email)
}

/// ISO 4217 style currency code
pub fn currency(value: &str) -> Result<String, String> {
    let code = value.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(format!("Invalid currency code: '{}'", value));
    }
    Ok(code)
}

/// Empty optional strings become `None`
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug(" Basmati-Rice ").unwrap(), "basmati-rice");
        assert!(slug("rice & beans").is_err());
        assert!(slug("-rice").is_err());
        assert!(slug("").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Basmati Rice 1121"), "basmati-rice-1121");
        assert_eq!(slugify("  Saffron (Grade A) "), "saffron-grade-a");
    }

    #[test]
    fn test_email() {
        assert!(email("buyer@example.com").is_ok());
        assert!(email("buyer@localhost").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("buyer example@example.com").is_err());
    }

    #[test]
    fn test_numbers() {
        assert!(positive_factor(2.2046, "factor").is_ok());
        assert!(positive_factor(0.0, "factor").is_err());
        assert!(positive_factor(f64::NAN, "factor").is_err());
        assert!(non_negative(0.0, "price").is_ok());
        assert!(non_negative(-0.01, "price").is_err());
    }

    #[test]
    fn test_currency() {
        assert_eq!(currency("usd").unwrap(), "USD");
        assert!(currency("US").is_err());
    }
}
