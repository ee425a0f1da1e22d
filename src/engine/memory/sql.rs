//! The small SQL surface the memory engine understands.
//!
//! Statements are classified by their leading keywords. Parameters are
//! described from `cast(? as <type>)` markers; a bare `?` is a VARCHAR(255).
//! A select whose items are all casts is a loopback: each output column
//! echoes its parameter or literal.

use super::cell::Cell;
use super::metadata::FieldSpec;
use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::types::SqlType;

const BARE_PARAMETER_LENGTH: u32 = 255;

/// Source of a loopback output column.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Parameter(usize),
    Literal(Cell),
}

/// A statement as the memory engine parsed it.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    pub statement_type: u32,
    pub inputs: Vec<FieldSpec>,
    pub outputs: Vec<(FieldSpec, Source)>,
}

fn dsql_error(message: impl AsRef<str>) -> Error {
    Error::engine(
        vec![ISC_DSQL_ERROR],
        format!("Dynamic SQL Error\n-SQL error code = -104\n-{}", message.as_ref()),
    )
}

/// Lowercase, collapse whitespace outside quotes and drop a trailing `;`.
pub fn normalize(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_quote = false;
    let mut pending_space = false;
    for c in sql.trim().trim_end_matches(';').trim_end().chars() {
        if c == '\'' {
            in_quote = !in_quote;
        }
        if !in_quote && c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if in_quote {
            out.push(c);
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

fn starts_with_words(sql: &str, words: &str) -> bool {
    sql == words || sql.starts_with(&format!("{} ", words)) || sql.starts_with(&format!("{}(", words))
}

/// Statement kind from the leading keywords of normalized SQL.
pub fn classify(sql: &str) -> Result<u32> {
    let kind = if starts_with_words(sql, "select") || starts_with_words(sql, "with") {
        if sql.contains(" for update") || sql.contains(" with lock") {
            STMT_SELECT_FOR_UPD
        } else {
            STMT_SELECT
        }
    } else if starts_with_words(sql, "update or insert") || starts_with_words(sql, "insert") {
        STMT_INSERT
    } else if starts_with_words(sql, "update") || starts_with_words(sql, "merge") {
        STMT_UPDATE
    } else if starts_with_words(sql, "delete") {
        STMT_DELETE
    } else if ["create", "alter", "drop", "recreate", "comment", "grant", "revoke", "declare"]
        .iter()
        .any(|w| starts_with_words(sql, w))
    {
        STMT_DDL
    } else if starts_with_words(sql, "execute procedure") || starts_with_words(sql, "execute block") {
        STMT_EXEC_PROCEDURE
    } else if starts_with_words(sql, "set transaction") {
        STMT_START_TRANS
    } else if starts_with_words(sql, "commit") {
        STMT_COMMIT
    } else if starts_with_words(sql, "rollback to") {
        STMT_SAVEPOINT
    } else if starts_with_words(sql, "rollback") {
        STMT_ROLLBACK
    } else if starts_with_words(sql, "savepoint") || starts_with_words(sql, "release savepoint") {
        STMT_SAVEPOINT
    } else if starts_with_words(sql, "set generator") || starts_with_words(sql, "set sequence") {
        STMT_SET_GENERATOR
    } else if starts_with_words(sql, "get segment") {
        STMT_GET_SEGMENT
    } else if starts_with_words(sql, "put segment") {
        STMT_PUT_SEGMENT
    } else {
        let token = sql.split_whitespace().next().unwrap_or("");
        return Err(dsql_error(format!("Token unknown - {}", token)));
    };
    Ok(kind)
}

/// Index of the `)` closing the group opened just before `text`.
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quote = false;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

/// Split at top-level commas.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth = depth.saturating_sub(1),
            ',' if !in_quote && depth == 0 => {
                items.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(text[start..].trim());
    items
}

/// Byte position of a top-level ` from ` keyword.
fn find_from(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quote = false;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth = depth.saturating_sub(1),
            ' ' if !in_quote && depth == 0 && text[i..].starts_with(" from ") => return Some(i),
            _ => {}
        }
    }
    None
}

/// Describe every parameter marker in statement order.
fn parse_parameters(sql: &str) -> Result<Vec<FieldSpec>> {
    let mut inputs = Vec::new();
    let mut in_quote = false;
    for (i, c) in sql.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '?' if !in_quote => {
                let before = sql[..i].trim_end();
                let after = sql[i + 1..].trim_start();
                let spec = match (before.strip_suffix('('), after.strip_prefix("as ")) {
                    (Some(head), Some(rest)) if head.trim_end().ends_with("cast") => {
                        let end = closing_paren(rest)
                            .ok_or_else(|| dsql_error("Unexpected end of command"))?;
                        parse_type(&rest[..end])?
                    }
                    _ => FieldSpec::new(SqlType::Varying).with_length(BARE_PARAMETER_LENGTH),
                };
                inputs.push(spec);
            }
            _ => {}
        }
    }
    Ok(inputs)
}

/// Parse a cast target type.
pub fn parse_type(text: &str) -> Result<FieldSpec> {
    let mut text = text.trim().to_string();
    for suffix in [" character set ", " collate "] {
        if let Some(pos) = text.find(suffix) {
            text.truncate(pos);
        }
    }
    let (name, args) = match text.find('(') {
        Some(open) => {
            let close = text.rfind(')').ok_or_else(|| dsql_error("Unexpected end of command"))?;
            let args = text[open + 1..close]
                .split(',')
                .map(|a| a.trim().parse::<u32>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| dsql_error(format!("Token unknown - {}", text)))?;
            (text[..open].trim().to_string(), args)
        }
        None => (text.clone(), Vec::new()),
    };

    let spec = match (name.as_str(), args.as_slice()) {
        ("boolean", []) => FieldSpec::new(SqlType::Boolean),
        ("smallint", []) => FieldSpec::new(SqlType::Short),
        ("integer" | "int", []) => FieldSpec::new(SqlType::Long),
        ("bigint", []) => FieldSpec::new(SqlType::Int64),
        ("int128", []) => FieldSpec::new(SqlType::Int128),
        ("float" | "real", []) => FieldSpec::new(SqlType::Float),
        ("double precision", []) => FieldSpec::new(SqlType::Double),
        ("decfloat", []) | ("decfloat", [34]) => FieldSpec::new(SqlType::Dec34),
        ("decfloat", [16]) => FieldSpec::new(SqlType::Dec16),
        ("numeric" | "decimal", []) => FieldSpec::new(SqlType::Long),
        ("numeric" | "decimal", [precision]) => numeric(&name, *precision, 0)?,
        ("numeric" | "decimal", [precision, scale]) => numeric(&name, *precision, *scale)?,
        ("date", []) => FieldSpec::new(SqlType::Date),
        ("time" | "time without time zone", []) => FieldSpec::new(SqlType::Time),
        ("timestamp" | "timestamp without time zone", []) => FieldSpec::new(SqlType::Timestamp),
        ("time with time zone", []) => FieldSpec::new(SqlType::TimeTz),
        ("timestamp with time zone", []) => FieldSpec::new(SqlType::TimestampTz),
        ("char" | "character", []) => FieldSpec::new(SqlType::Text).with_length(1),
        ("char" | "character", [length]) => FieldSpec::new(SqlType::Text).with_length(*length),
        ("varchar" | "character varying" | "char varying", [length]) => {
            FieldSpec::new(SqlType::Varying).with_length(*length)
        }
        ("blob" | "blob sub_type text" | "blob sub_type 1" | "blob sub_type binary" | "blob sub_type 0", []) => {
            FieldSpec::new(SqlType::Blob)
        }
        _ => return Err(dsql_error(format!("Data type unknown - {}", text))),
    };
    Ok(spec)
}

fn numeric(name: &str, precision: u32, scale: u32) -> Result<FieldSpec> {
    if !(1..=38).contains(&precision) || scale > precision {
        return Err(dsql_error(format!(
            "Precision must be from 1 to 38 and scale not above it - {}({},{})",
            name, precision, scale
        )));
    }
    let sql_type = match precision {
        1..=4 if name == "numeric" => SqlType::Short,
        1..=9 => SqlType::Long,
        10..=18 => SqlType::Int64,
        _ => SqlType::Int128,
    };
    Ok(FieldSpec::new(sql_type).with_scale(-(scale as i32)))
}

/// Parse a literal cast operand.
fn parse_literal(text: &str) -> Result<Cell> {
    let text = text.trim();
    if text == "null" {
        return Ok(Cell::Null);
    }
    if let Some(inner) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return Ok(Cell::Text(inner.replace("''", "'")));
    }
    if text == "true" || text == "false" {
        return Ok(Cell::Bool(text == "true"));
    }
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit() || b"+-.e".contains(&b)) {
        return Ok(Cell::Text(text.to_string()));
    }
    Err(dsql_error(format!("Token unknown - {}", text)))
}

/// Parse one `cast(<operand> as <type>) [[as] alias]` select item.
fn parse_select_item(item: &str, next_parameter: &mut usize) -> Result<(FieldSpec, Source)> {
    let unsupported = || dsql_error(format!("Column expression not supported - {}", item));
    let body = item
        .strip_prefix("cast")
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('('))
        .ok_or_else(unsupported)?;
    let close = closing_paren(body).ok_or_else(unsupported)?;
    let (operand, target) = body[..close].split_once(" as ").ok_or_else(unsupported)?;

    let source = if operand.trim() == "?" {
        let index = *next_parameter;
        *next_parameter += 1;
        Source::Parameter(index)
    } else {
        Source::Literal(parse_literal(operand)?)
    };

    let rest = body[close + 1..].trim();
    let alias = rest.strip_prefix("as ").unwrap_or(rest).trim();
    let alias = if alias.is_empty() {
        "CAST".to_string()
    } else {
        alias.trim_matches('"').to_uppercase()
    };
    let spec = parse_type(target)?.with_field("CAST").with_alias(alias);
    Ok((spec, source))
}

/// Parse normalized SQL.
pub fn parse(sql: &str) -> Result<ParsedStatement> {
    let statement_type = classify(sql)?;
    let inputs = parse_parameters(sql)?;
    let mut outputs = Vec::new();

    if statement_type == STMT_SELECT || statement_type == STMT_SELECT_FOR_UPD {
        let projection = sql
            .strip_prefix("select")
            .map(str::trim_start)
            .ok_or_else(|| dsql_error("Token unknown - with"))?;
        let from = find_from(projection).ok_or_else(|| dsql_error("Unexpected end of command"))?;
        let source = projection[from..].trim_start();
        let table = source
            .strip_prefix("from ")
            .and_then(|s| s.split_whitespace().next())
            .unwrap_or("");
        if table != "rdb$database" {
            return Err(Error::engine(
                vec![ISC_DSQL_ERROR, ISC_DSQL_TABLE_UNKNOWN],
                format!("Dynamic SQL Error\n-SQL error code = -204\n-Table unknown\n-{}", table.to_uppercase()),
            ));
        }
        let mut next_parameter = 0;
        for item in split_top_level(&projection[..from]) {
            outputs.push(parse_select_item(item, &mut next_parameter)?);
        }
    }

    Ok(ParsedStatement {
        statement_type,
        inputs,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize("  SELECT  'A  b'\n FROM Rdb$Database ; "),
            "select 'A  b' from rdb$database"
        );
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("select 1 from rdb$database").unwrap(), STMT_SELECT);
        assert_eq!(classify("select x from t for update").unwrap(), STMT_SELECT_FOR_UPD);
        assert_eq!(classify("update or insert into t values (1)").unwrap(), STMT_INSERT);
        assert_eq!(classify("recreate table t (x int)").unwrap(), STMT_DDL);
        assert_eq!(classify("execute block as begin end").unwrap(), STMT_EXEC_PROCEDURE);
        assert_eq!(classify("set transaction").unwrap(), STMT_START_TRANS);
        assert_eq!(classify("commit work").unwrap(), STMT_COMMIT);
        assert_eq!(classify("rollback").unwrap(), STMT_ROLLBACK);
        assert_eq!(classify("rollback to savepoint s1").unwrap(), STMT_SAVEPOINT);
        assert_eq!(classify("get segment").unwrap(), STMT_GET_SEGMENT);
        let err = classify("frobnicate").unwrap_err();
        assert_eq!(err.codes(), vec![ISC_DSQL_ERROR]);
    }

    #[test]
    fn test_parse_type() {
        let spec = parse_type("numeric(18,2)").unwrap();
        assert_eq!((spec.sql_type, spec.scale), (SqlType::Int64, -2));
        assert_eq!(parse_type("numeric(4,1)").unwrap().sql_type, SqlType::Short);
        assert_eq!(parse_type("decimal(4,1)").unwrap().sql_type, SqlType::Long);
        assert_eq!(parse_type("numeric(38,4)").unwrap().sql_type, SqlType::Int128);
        let spec = parse_type("char(5) character set utf8").unwrap();
        assert_eq!((spec.sql_type, spec.length), (SqlType::Text, 5));
        assert_eq!(parse_type("decfloat(16)").unwrap().sql_type, SqlType::Dec16);
        assert_eq!(parse_type("timestamp with time zone").unwrap().sql_type, SqlType::TimestampTz);
        assert!(parse_type("numeric(40,2)").is_err());
        assert!(parse_type("geometry").is_err());
    }

    #[test]
    fn test_parse_loopback() {
        let sql = normalize("select cast(? as integer) as a, cast('x' as varchar(3)), cast(? as date) d from rdb$database");
        let parsed = parse(&sql).unwrap();
        assert_eq!(parsed.statement_type, STMT_SELECT);
        assert_eq!(parsed.inputs.len(), 2);
        assert_eq!(parsed.inputs[1].sql_type, SqlType::Date);
        assert_eq!(parsed.outputs.len(), 3);
        assert_eq!(parsed.outputs[0].0.alias, "A");
        assert_eq!(parsed.outputs[0].1, Source::Parameter(0));
        assert_eq!(parsed.outputs[1].1, Source::Literal(Cell::Text("x".into())));
        assert_eq!(parsed.outputs[1].0.alias, "CAST");
        assert_eq!(parsed.outputs[2].1, Source::Parameter(1));
        assert_eq!(parsed.outputs[2].0.alias, "D");
    }

    #[test]
    fn test_parse_non_select_parameters() {
        let parsed = parse("insert into t (a, b) values (cast(? as bigint), ?)").unwrap();
        assert_eq!(parsed.statement_type, STMT_INSERT);
        assert_eq!(parsed.inputs[0].sql_type, SqlType::Int64);
        assert_eq!(parsed.inputs[1].sql_type, SqlType::Varying);
        assert!(parsed.outputs.is_empty());
    }

    #[test]
    fn test_unknown_table() {
        let err = parse("select cast(? as integer) from employees").unwrap_err();
        assert!(err.codes().contains(&ISC_DSQL_TABLE_UNKNOWN));
    }
}
