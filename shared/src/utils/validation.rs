use regex::Regex;

// Validate format email
pub fn is_valid_email(email: &str) -> bool {
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"
    ).unwrap();

    email_regex.is_match(email)
}

// Validate nomor HP Bangladesh (format: 01xxx atau +8801xxx)
pub fn is_valid_phone(phone: &str) -> bool {
    let phone_regex = Regex::new(r"^(\+?880|0)1[3-9][0-9]{8}$").unwrap();
    phone_regex.is_match(phone)
}

// Validate amount (harus positif, max 10 juta)
pub fn is_valid_amount(amount: f64) -> bool {
    amount > 0.0 && amount <= 10_000_000.0
}

// Validate quantity per line item (1-1000)
pub fn is_valid_quantity(quantity: i32) -> bool {
    (1..=1000).contains(&quantity)
}

// Cek field wajib seperti rejection reason tidak blank
pub fn is_nonblank(text: &str) -> bool {
    !text.trim().is_empty()
}

// Sanitize string untuk prevent XSS
pub fn sanitize_html(input: &str) -> String {
    input
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("user.name+tag@example.com.bd"));
        assert!(!is_valid_email("invalid.email"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn test_phone_validation() {
        assert!(is_valid_phone("01712345678"));
        assert!(is_valid_phone("+8801712345678"));
        assert!(is_valid_phone("8801912345678"));
        assert!(!is_valid_phone("01212345678"));
        assert!(!is_valid_phone("12345"));
    }

    #[test]
    fn test_amount_validation() {
        assert!(is_valid_amount(100.0));
        assert!(is_valid_amount(9_999_999.0));
        assert!(!is_valid_amount(0.0));
        assert!(!is_valid_amount(-100.0));
        assert!(!is_valid_amount(15_000_000.0));
    }

    #[test]
    fn test_quantity_validation() {
        assert!(is_valid_quantity(1));
        assert!(is_valid_quantity(1000));
        assert!(!is_valid_quantity(0));
        assert!(!is_valid_quantity(-2));
        assert!(!is_valid_quantity(1001));
    }

    #[test]
    fn test_is_nonblank() {
        assert!(is_nonblank("out of stock"));
        assert!(!is_nonblank(""));
        assert!(!is_nonblank("   "));
        assert!(!is_nonblank("\t\n"));
    }

    #[test]
    fn test_sanitize_html() {
        assert_eq!(sanitize_html("<b>hi</b>"), "&lt;b&gt;hi&lt;/b&gt;");
        assert_eq!(sanitize_html("plain text"), "plain text");
    }
}
