use rand::Rng;

const ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_SUFFIX_LENGTH: usize = 14;

/// Generates a new resource id: `prefix` followed by 14 random lower-case
/// alphanumeric characters.
#[must_use]
pub fn new_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LENGTH)
        .map(|_| char::from(ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())]))
        .collect();
    format!("{prefix}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_shape() {
        let id = new_id("att-");
        assert!(id.starts_with("att-"));
        assert_eq!(id.len(), 4 + ID_SUFFIX_LENGTH);
        assert!(id[4..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(new_id("app-"), new_id("app-"));
    }
}
