//! # Utility Functions Module
//!
//! Small helpers shared by the command builders.

/// Converts an iterable of string-like items to `Vec<String>`.
///
/// Avoids repeating `.to_string()` on every argument when building
/// command lines.
///
/// # Example
/// ```rust
/// use panda_compress::utils::to_string_vec;
///
/// let crf = 30.to_string();
/// let args = to_string_vec(["-c:v", "libx264", "-crf", crf.as_str()]);
/// assert_eq!(args[3], "30");
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_string_vec_string_literals() {
        let result = to_string_vec(["-c:v", "libx264"]);
        assert_eq!(result, vec!["-c:v".to_string(), "libx264".to_string()]);
    }

    #[test]
    fn test_to_string_vec_numbers() {
        let result = to_string_vec([18u8, 23, 26]);
        assert_eq!(result, vec!["18".to_string(), "23".to_string(), "26".to_string()]);
    }

    #[test]
    fn test_to_string_vec_empty() {
        let result: Vec<String> = to_string_vec(Vec::<&str>::new());
        assert!(result.is_empty());
    }
}
