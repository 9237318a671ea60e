//! SQL pretty-printing for log output.
//!
//! Renders a statement as a single line with its positional placeholders
//! substituted by the bound parameter values. Only used for logging; the
//! rendered text is never sent to the database.

use crate::db::query::QueryParam;

/// Positional placeholder style of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// PostgreSQL style: `$1`, `$2`, ...
    Dollar,
    /// SQLite style: `?`, bound in order.
    Question,
}

/// Render a parameter value for log output.
fn render(param: &QueryParam) -> String {
    match param {
        QueryParam::Null => "NULL".to_string(),
        QueryParam::Bool(v) => v.to_string(),
        QueryParam::Int(v) => v.to_string(),
        QueryParam::Float(v) => v.to_string(),
        QueryParam::String(v) => format!("'{}'", v.replace('\'', "''")),
        QueryParam::Json(v) => format!("'{}'", v),
    }
}

/// Produce a single-line, parameter-substituted form of the SQL for logging.
pub fn pretty(sql: &str, placeholder: Placeholder, params: &[QueryParam]) -> String {
    // Collapse internal whitespace so multi-line statements log on one line.
    let mut out = sql.split_whitespace().collect::<Vec<_>>().join(" ");

    match placeholder {
        Placeholder::Dollar => {
            // Substitute highest index first so $1 does not clobber $10.
            for (i, param) in params.iter().enumerate().rev() {
                out = out.replace(&format!("${}", i + 1), &render(param));
            }
        }
        Placeholder::Question => {
            for param in params {
                if let Some(pos) = out.find('?') {
                    out.replace_range(pos..pos + 1, &render(param));
                } else {
                    break;
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_dollar_substitution() {
        let sql = "SELECT * FROM users WHERE id = $1 AND name = $2";
        let params = vec![QueryParam::Int(7), QueryParam::String("ann".to_string())];
        let out = pretty(sql, Placeholder::Dollar, &params);
        assert_eq!(out, "SELECT * FROM users WHERE id = 7 AND name = 'ann'");
    }

    #[test]
    fn test_pretty_dollar_double_digit_placeholders() {
        let sql = "INSERT INTO t VALUES ($1, $10)";
        let mut params = vec![QueryParam::Int(1)];
        params.extend((2..=10).map(QueryParam::Int));
        let out = pretty(sql, Placeholder::Dollar, &params);
        assert_eq!(out, "INSERT INTO t VALUES (1, 10)");
    }

    #[test]
    fn test_pretty_question_substitution() {
        let sql = "UPDATE users SET name = ? WHERE id = ?";
        let params = vec![QueryParam::String("bob".to_string()), QueryParam::Int(3)];
        let out = pretty(sql, Placeholder::Question, &params);
        assert_eq!(out, "UPDATE users SET name = 'bob' WHERE id = 3");
    }

    #[test]
    fn test_pretty_collapses_whitespace() {
        let sql = "SELECT *\n\tFROM users\n\tWHERE id = $1";
        let out = pretty(sql, Placeholder::Dollar, &[QueryParam::Int(1)]);
        assert_eq!(out, "SELECT * FROM users WHERE id = 1");
    }

    #[test]
    fn test_pretty_escapes_quotes() {
        let sql = "SELECT $1";
        let params = vec![QueryParam::String("o'brien".to_string())];
        let out = pretty(sql, Placeholder::Dollar, &params);
        assert_eq!(out, "SELECT 'o''brien'");
    }

    #[test]
    fn test_pretty_null_and_bool() {
        let sql = "SELECT $1, $2";
        let params = vec![QueryParam::Null, QueryParam::Bool(true)];
        let out = pretty(sql, Placeholder::Dollar, &params);
        assert_eq!(out, "SELECT NULL, true");
    }
}
