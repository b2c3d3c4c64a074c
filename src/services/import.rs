//! 批量导入文件解析
//!
//! 每行一条权限：`code,name,description,validUntil`。
//! - 首行若与表头相同（不区分大小写）则跳过
//! - 空行跳过，字段去除首尾空白
//! - 字段可用双引号包裹，`""` 表示一个引号；引号内不支持换行

use crate::{error::AppError, models::permission::CreatePermissionRequest};
use std::collections::HashSet;
use validator::Validate;

const FIELD_COUNT: usize = 4;
const HEADER: [&str; FIELD_COUNT] = ["code", "name", "description", "validuntil"];

/// 上传的文件
#[derive(Debug, Clone)]
pub struct ImportUpload {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// 解析后的一行，`line` 从 1 开始
#[derive(Debug, Clone)]
pub struct ImportRow {
    pub line: usize,
    pub request: CreatePermissionRequest,
}

/// 解析并校验整个文件。任意一行出错即返回错误，不返回部分结果
pub fn parse_rows(content: &[u8], max_rows: usize) -> Result<Vec<ImportRow>, AppError> {
    let text = std::str::from_utf8(content)
        .map_err(|e| AppError::upload_parse(0, format!("file is not valid UTF-8: {}", e)))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rows = Vec::new();
    let mut seen_codes = HashSet::new();
    let mut first_record = true;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let fields = split_record(raw).map_err(|reason| AppError::upload_parse(line, reason))?;

        if std::mem::take(&mut first_record) && is_header(&fields) {
            continue;
        }

        if fields.len() != FIELD_COUNT {
            return Err(AppError::upload_parse(
                line,
                format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
            ));
        }

        let mut fields = fields.into_iter();
        let request = CreatePermissionRequest {
            code: fields.next().unwrap_or_default(),
            name: fields.next().unwrap_or_default(),
            description: fields.next().unwrap_or_default(),
            valid_until: fields.next().unwrap_or_default(),
        };

        request
            .validate()
            .map_err(|e| AppError::upload_parse(line, e.to_string()))?;

        if !seen_codes.insert(request.code.clone()) {
            return Err(AppError::upload_parse(
                line,
                format!("code '{}' appears more than once in the file", request.code),
            ));
        }

        if rows.len() == max_rows {
            return Err(AppError::upload_parse(
                line,
                format!("file exceeds the limit of {} rows", max_rows),
            ));
        }

        rows.push(ImportRow { line, request });
    }

    if rows.is_empty() {
        return Err(AppError::upload_parse(0, "file contains no permission rows"));
    }

    Ok(rows)
}

fn is_header(fields: &[String]) -> bool {
    fields.len() == FIELD_COUNT
        && fields.iter().zip(HEADER).all(|(field, expected)| {
            field.replace('_', "").eq_ignore_ascii_case(expected)
        })
}

/// 拆分一行，处理双引号字段
fn split_record(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::with_capacity(FIELD_COUNT);
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    let mut was_quoted = false;

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() && !was_quoted => {
                current.clear();
                in_quotes = true;
                was_quoted = true;
            }
            '"' => return Err("unexpected quote inside unquoted field".to_string()),
            ',' if !in_quotes => {
                fields.push(finish_field(&mut current, was_quoted));
                was_quoted = false;
            }
            _ if was_quoted && !in_quotes => {
                if !c.is_whitespace() {
                    return Err("unexpected text after closing quote".to_string());
                }
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }

    fields.push(finish_field(&mut current, was_quoted));
    Ok(fields)
}

fn finish_field(current: &mut String, was_quoted: bool) -> String {
    let field = std::mem::take(current);
    if was_quoted {
        field
    } else {
        field.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_header_and_blank_lines() {
        let content = b"code,name,description,validUntil\r\n\
            perm1,Read Orders,Can read orders,01-01-2030\r\n\
            \r\n\
            perm2,Write Orders,,31-12-2030\r\n";

        let rows = parse_rows(content, 100).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].request.code, "perm1");
        assert_eq!(rows[1].line, 4);
        assert_eq!(rows[1].request.description, "");
        assert_eq!(rows[1].request.valid_until, "31-12-2030");
    }

    #[test]
    fn test_parse_without_header() {
        let rows = parse_rows(b"perm1,Read,desc,01-01-2030", 100).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 1);
    }

    #[test]
    fn test_quoted_fields() {
        let content = b"perm1,\"Read, Write\",\"He said \"\"hi\"\"\",01-01-2030";
        let rows = parse_rows(content, 100).unwrap();
        assert_eq!(rows[0].request.name, "Read, Write");
        assert_eq!(rows[0].request.description, "He said \"hi\"");
    }

    #[test]
    fn test_wrong_field_count_reports_line() {
        let content = b"perm1,Read,desc,01-01-2030\nperm2,Write,01-01-2030\n";
        match parse_rows(content, 100) {
            Err(AppError::UploadParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_rejected() {
        let content = b"perm1,Read,desc,2030-01-01";
        assert!(matches!(
            parse_rows(content, 100),
            Err(AppError::UploadParse { line: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_code_in_file_rejected() {
        let content = b"perm1,Read,desc,01-01-2030\nperm1,Read again,desc,01-01-2030";
        assert!(matches!(
            parse_rows(content, 100),
            Err(AppError::UploadParse { line: 2, .. })
        ));
    }

    #[test]
    fn test_empty_and_header_only_files_rejected() {
        assert!(parse_rows(b"", 100).is_err());
        assert!(parse_rows(b"code,name,description,validUntil\n", 100).is_err());
    }

    #[test]
    fn test_row_limit() {
        let content = b"a,A,,01-01-2030\nb,B,,01-01-2030\nc,C,,01-01-2030";
        assert!(parse_rows(content, 2).is_err());
        assert_eq!(parse_rows(content, 3).unwrap().len(), 3);
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(parse_rows(b"perm1,\"Read,desc,01-01-2030", 100).is_err());
    }

    #[test]
    fn test_non_utf8_rejected() {
        assert!(parse_rows(&[0xff, 0xfe, 0x00], 100).is_err());
    }
}
