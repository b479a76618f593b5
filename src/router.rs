use std::collections::HashMap;

/// Normalized location name → WhatsApp address, with a fallback for every
/// location that is not listed.
#[derive(Debug, Clone)]
pub struct RecipientDirectory {
    entries: HashMap<String, String>,
    fallback: String,
}

impl RecipientDirectory {
    pub fn new<I, K, V>(entries: I, fallback: impl AsRef<str>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(city, address)| {
                (
                    normalize_location(city.as_ref()),
                    whatsapp_address(address.as_ref()),
                )
            })
            .collect();
        Self {
            entries,
            fallback: whatsapp_address(fallback.as_ref()),
        }
    }

    pub fn resolve(&self, location: &str) -> &str {
        self.entries
            .get(&normalize_location(location))
            .unwrap_or(&self.fallback)
    }
}

/// Uppercase with all whitespace removed, so `" new  delhi"` and `"NewDelhi"`
/// land on the same entry.
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Canonical `whatsapp:+<digits>` form of a configured number.
pub fn whatsapp_address(number: &str) -> String {
    let number = number.trim();
    if number.starts_with("whatsapp:") {
        return number.to_string();
    }
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("whatsapp:+{}", digits)
}
