//! URL construction for the external messaging webhook (CallMeBot).

const ENDPOINT: &str = "https://api.callmebot.com/whatsapp.php";

/// Percent-encodes everything outside the RFC 3986 unreserved set
/// (ALPHA / DIGIT / "-" / "_" / "." / "~").
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.as_bytes() {
        let c = *byte as char;
        if c.is_ascii_alphanumeric() || "-_.~".contains(c) {
            out.push(c);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// The full GET URL carrying the recipient, the API key and the escaped
/// message body as query parameters.
pub fn alert_url(phone_number: &str, api_key: &str, text: &str) -> String {
    format!(
        "{ENDPOINT}?phone={}&apikey={}&text={}",
        percent_encode(phone_number),
        percent_encode(api_key),
        percent_encode(text),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreserved_characters_pass_through() {
        assert_eq!(percent_encode("abc-XYZ_0.9~"), "abc-XYZ_0.9~");
    }

    #[test]
    fn reserved_characters_are_escaped() {
        assert_eq!(percent_encode("a b"), "a%20b");
        assert_eq!(percent_encode("+49"), "%2B49");
        assert_eq!(percent_encode("50%\n"), "50%25%0A");
    }

    #[test]
    fn url_carries_all_three_parameters() {
        let url = alert_url("+1234567898765", "abc123", "Humidity: *55.00* %");
        assert!(url.starts_with("https://api.callmebot.com/whatsapp.php?"));
        assert!(url.contains("phone=%2B1234567898765"));
        assert!(url.contains("apikey=abc123"));
        assert!(url.contains("text=Humidity%3A%20%2A55.00%2A%20%25"));
    }
}
