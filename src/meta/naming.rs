/// Suffix marking a side table.
pub const SIDE_TABLE_SUFFIX: &str = "_meta";

const CLOSING_QUOTES: &[char] = &['}', ']', '`', '"'];
const OPENING_QUOTES: &[char] = &['{', '[', '`', '"', '%'];

/// Derives the side-table name from a primary table name.
///
/// The suffix goes in front of any trailing quoting decoration, so
/// `{{%user}}` becomes `{{%user_meta}}` and `"crm"."user"` becomes
/// `"crm"."user_meta"`. The decoration is kept intact, which makes the
/// mapping injective.
pub fn side_table_name(primary_table: &str) -> String {
    let body = primary_table.trim_end_matches(CLOSING_QUOTES);
    let decoration = &primary_table[body.len()..];
    format!("{}{}{}", body, SIDE_TABLE_SUFFIX, decoration)
}

/// Strips quoting decoration, keeping only the last dotted segment.
pub fn bare_table_name(table: &str) -> &str {
    let last = table.rsplit('.').next().unwrap_or(table);
    last.trim_start_matches(OPENING_QUOTES)
        .trim_end_matches(CLOSING_QUOTES)
}

/// Sanitizes a string for use as an identifier fragment.
///
/// Converts non-alphanumeric characters to underscores and lowercases the result.
pub fn sanitize_sql_identifier(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Generates a default index name.
///
/// Format: `idx_<table>_<field>`
pub fn default_index_name(table_name: &str, field_name: &str) -> String {
    let table = sanitize_sql_identifier(bare_table_name(table_name));
    let field = sanitize_sql_identifier(field_name);
    format!("idx_{}_{}", table, field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        assert_eq!(side_table_name("user"), "user_meta");
    }

    #[test]
    fn test_suffix_goes_inside_decoration() {
        assert_eq!(side_table_name("{{%user}}"), "{{%user_meta}}");
        assert_eq!(side_table_name("`post`"), "`post_meta`");
        assert_eq!(side_table_name("\"crm\".\"user\""), "\"crm\".\"user_meta\"");
        assert_eq!(side_table_name("[dbo].[order]"), "[dbo].[order_meta]");
    }

    #[test]
    fn test_deterministic_and_distinct() {
        let names = ["user", "user_meta", "{{%user}}", "`user`", "users"];
        let derived: Vec<String> = names.iter().map(|n| side_table_name(n)).collect();
        for (i, a) in derived.iter().enumerate() {
            assert_eq!(a, &side_table_name(names[i]));
            for b in derived.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_index_name_uses_bare_table() {
        assert_eq!(
            default_index_name("{{%user_meta}}", "record_key"),
            "idx_user_meta_record_key"
        );
        assert_eq!(
            default_index_name("\"crm\".\"User-Meta\"", "record_key"),
            "idx_user_meta_record_key"
        );
    }
}
