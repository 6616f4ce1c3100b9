/// Comparison key for brand names: surrounding whitespace dropped,
/// Unicode upper-case (`" Bosch "` and `"bosch"` both become `"BOSCH"`).
pub fn normalize_brand(brand: &str) -> String {
    brand.trim().to_uppercase()
}

/// Replaces characters that are not allowed in file names on common
/// platforms with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// File name of the split output for a configured brand.
pub fn brand_file_name(brand: &str) -> String {
    format!("brand_{}.csv", sanitize_filename(brand))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_case_and_padding_match() {
        assert_eq!(normalize_brand("bosch"), "BOSCH");
        assert_eq!(normalize_brand(" Bosch "), "BOSCH");
        assert_eq!(normalize_brand("BOSCH"), "BOSCH");
    }

    #[test]
    fn uppercases_cyrillic() {
        assert_eq!(normalize_brand("лада"), "ЛАДА");
    }

    #[test]
    fn sanitizes_reserved_characters() {
        assert_eq!(sanitize_filename("A/B:C*D?\"E<F>G|H\\I"), "A_B_C_D__E_F_G_H_I");
    }

    #[test]
    fn builds_brand_file_name() {
        assert_eq!(brand_file_name("MANN"), "brand_MANN.csv");
        assert_eq!(brand_file_name("K&N / Filters"), "brand_K&N _ Filters.csv");
    }
}
