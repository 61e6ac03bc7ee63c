// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP/IFC tokenizer using nom
//!
//! Zero-copy tokenization of single records, a quote-aware record scanner
//! for the DATA section and a small reader for the HEADER section.

use memchr::{memchr, memchr2, memmem};
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// STEP/IFC Token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal, still STEP-encoded: 'it''s'
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Float: 3.14
    Float(f64),
    /// Enum: .T., .NOTDEFINED.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: IFCLABEL('x'), IFCBOOLEAN(.T.)
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Derived value: *
    Derived,
}

fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::EntityRef,
    )(input)
}

/// Parse string literal: 'text'
/// IFC uses '' to escape a single quote within a string
fn string_literal(input: &str) -> IResult<&str, Token> {
    fn string_content(input: &str) -> IResult<&str, &str> {
        let bytes = input.as_bytes();
        let mut i = 0;
        while let Some(offset) = memchr(b'\'', &bytes[i..]) {
            let quote = i + offset;
            if bytes.get(quote + 1) == Some(&b'\'') {
                i = quote + 2;
                continue;
            }
            return Ok((&input[quote..], &input[..quote]));
        }
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }

    map(
        delimited(char('\''), string_content, char('\'')),
        Token::String,
    )(input)
}

fn integer(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(pair(opt(one_of("+-")), digit1)),
        |s: &str| lexical_core::parse::<i64>(s.as_bytes()).map(Token::Integer),
    )(input)
}

/// Parse float: 3.14, -3.14, 1.5E-10, 0., 1.
/// IFC allows floats like "0." without decimal digits
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| fast_float::parse::<f64, _>(s).map(Token::Float),
    )(input)
}

fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

fn null(input: &str) -> IResult<&str, Token> {
    map(char('$'), |_| Token::Null)(input)
}

fn derived(input: &str) -> IResult<&str, Token> {
    map(char('*'), |_| Token::Derived)(input)
}

fn typed_value(input: &str) -> IResult<&str, Token> {
    map(
        pair(
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            arguments,
        ),
        |(type_name, args)| Token::TypedValue(type_name, args),
    )(input)
}

fn ws(input: &str) -> IResult<&str, ()> {
    map(take_while(|c: char| c.is_whitespace()), |_| ())(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float, // before integer, float includes '.'
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            null,
            derived,
        )),
        ws,
    )(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        pair(char('('), ws),
        separated_list0(delimited(ws, char(','), ws), token),
        pair(ws, char(')')),
    )(input)
}

fn list(input: &str) -> IResult<&str, Token> {
    map(arguments, Token::List)(input)
}

fn keyword(input: &str) -> IResult<&str, &str> {
    delimited(
        ws,
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        ws,
    )(input)
}

/// Parse a complete entity record
/// Example: #123=IFCWALL('guid',#5,'name',$,$,$,$,$,$);
pub fn parse_entity(input: &str) -> Result<(u32, &str, Vec<Token>)> {
    let result: IResult<&str, (u32, &str, Vec<Token>)> = tuple((
        delimited(
            ws,
            preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
            ws,
        ),
        preceded(char('='), keyword),
        delimited(ws, arguments, tuple((ws, char(';')))),
    ))(input);

    match result {
        Ok((_, parsed)) => Ok(parsed),
        Err(e) => Err(Error::parse(0, format!("Failed to parse entity: {}", e))),
    }
}

/// Parse a header record such as FILE_SCHEMA(('IFC4X3_ADD2'));
fn parse_header_record(input: &str) -> Option<(&str, Vec<Token>)> {
    let parsed: IResult<&str, (&str, Vec<Token>)> =
        pair(keyword, delimited(ws, arguments, tuple((ws, char(';')))))(input);
    parsed.ok().map(|(_, record)| record)
}

/// Decode a raw STEP string into text.
///
/// Handles doubled apostrophes and backslashes and the `\X\hh`, `\X2\hhhh...\X0\` and
/// `\S\c` control directives.
pub fn decode_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = memchr2(b'\'', b'\\', rest.as_bytes()) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("''") {
            out.push('\'');
            rest = &tail[2..];
        } else if tail.starts_with("\\\\") {
            out.push('\\');
            rest = &tail[2..];
        } else if let Some(encoded) = tail.strip_prefix("\\X2\\") {
            let end = encoded.find("\\X0\\").unwrap_or(encoded.len());
            let units: Vec<u16> = encoded[..end]
                .as_bytes()
                .chunks(4)
                .filter_map(|chunk| std::str::from_utf8(chunk).ok())
                .filter_map(|hex| u16::from_str_radix(hex, 16).ok())
                .collect();
            out.push_str(&String::from_utf16_lossy(&units));
            rest = encoded.get(end + 4..).unwrap_or("");
        } else if let Some(encoded) = tail.strip_prefix("\\X\\") {
            match encoded.get(..2).and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                Some(byte) => {
                    out.push(char::from(byte));
                    rest = &encoded[2..];
                }
                None => {
                    out.push_str("\\X\\");
                    rest = encoded;
                }
            }
        } else if let Some(encoded) = tail.strip_prefix("\\S\\") {
            match encoded.chars().next() {
                Some(c) if c.is_ascii() => {
                    out.push(char::from(c as u8 + 128));
                    rest = &encoded[1..];
                }
                _ => {
                    out.push_str("\\S\\");
                    rest = encoded;
                }
            }
        } else {
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Metadata read from the HEADER section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepHeader {
    pub description: Vec<String>,
    pub file_name: Option<String>,
    pub time_stamp: Option<String>,
    pub originating_system: Option<String>,
    pub schema_identifiers: Vec<String>,
}

fn header_strings(token: &Token) -> Vec<String> {
    match token {
        Token::String(s) => vec![decode_string(s)],
        Token::List(items) => items.iter().flat_map(header_strings).collect(),
        _ => Vec::new(),
    }
}

/// Read FILE_DESCRIPTION, FILE_NAME and FILE_SCHEMA from the HEADER section
pub fn parse_header(content: &str) -> StepHeader {
    let mut header = StepHeader::default();
    let bytes = content.as_bytes();
    let Some(start) = memmem::find(bytes, b"HEADER;") else {
        return header;
    };
    let end = memmem::find(&bytes[start..], b"ENDSEC;")
        .map(|offset| start + offset)
        .unwrap_or(content.len());

    let mut scanner = RecordSplitter::new(&content[start + "HEADER;".len()..end]);
    while let Some(record) = scanner.next_record() {
        let Some((name, args)) = parse_header_record(record) else {
            continue;
        };
        match name.to_ascii_uppercase().as_str() {
            "FILE_DESCRIPTION" => {
                header.description = args.first().map(header_strings).unwrap_or_default();
            }
            "FILE_NAME" => {
                header.file_name = args.first().and_then(|t| header_strings(t).pop());
                header.time_stamp = args.get(1).and_then(|t| header_strings(t).pop());
                header.originating_system = args.get(5).and_then(|t| header_strings(t).pop());
            }
            "FILE_SCHEMA" => {
                header.schema_identifiers = args.first().map(header_strings).unwrap_or_default();
            }
            _ => {}
        }
    }
    header
}

/// Splits text into `;`-terminated records, ignoring semicolons in strings
struct RecordSplitter<'a> {
    content: &'a str,
    position: usize,
}

impl<'a> RecordSplitter<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            content,
            position: 0,
        }
    }

    fn next_record(&mut self) -> Option<&'a str> {
        let start = self.position;
        let end = record_end(self.content.as_bytes(), start)?;
        self.position = end;
        Some(self.content[start..end].trim())
    }
}

/// Offset one past the `;` that closes the record starting at `from`
fn record_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut in_string = false;
    let mut i = from;
    while let Some(offset) = memchr2(b'\'', b';', &bytes[i..]) {
        let at = i + offset;
        if bytes[at] == b'\'' {
            in_string = !in_string;
        } else if !in_string {
            return Some(at + 1);
        }
        i = at + 1;
    }
    None
}

/// Fast entity scanner - scans the DATA section without full parsing
pub struct EntityScanner<'a> {
    content: &'a str,
    position: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a scanner positioned at the start of the DATA section
    pub fn new(content: &'a str) -> Self {
        let position = memmem::find(content.as_bytes(), b"DATA;")
            .map(|p| p + "DATA;".len())
            .unwrap_or(0);
        Self { content, position }
    }

    /// Scan for the next entity
    /// Returns (entity_id, type_name, record_start, record_end)
    pub fn next_entity(&mut self) -> Option<(u32, &'a str, usize, usize)> {
        let bytes = self.content.as_bytes();
        loop {
            let hash = self.position + memchr(b'#', &bytes[self.position..])?;

            let id_start = hash + 1;
            let id_end = bytes[id_start..]
                .iter()
                .position(|b| !b.is_ascii_digit())
                .map(|i| id_start + i)?;
            let after_id = self.content[id_end..].trim_start();
            if id_end == id_start || !after_id.starts_with('=') {
                self.position = id_start;
                continue;
            }

            let line_end = record_end(bytes, id_end)?;
            let id = self.content[id_start..id_end].parse::<u32>().ok()?;

            let type_start = self.content.len() - after_id.len() + 1;
            let type_start = self.content[type_start..line_end]
                .find(|c: char| !c.is_whitespace())
                .map(|i| type_start + i)?;
            let type_end = self.content[type_start..line_end]
                .find(|c: char| c == '(' || c.is_whitespace())
                .map(|i| type_start + i)
                .unwrap_or(line_end);

            self.position = line_end;
            return Some((id, &self.content[type_start..type_end], hash, line_end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref() {
        assert_eq!(entity_ref("#123"), Ok(("", Token::EntityRef(123))));
        assert_eq!(entity_ref("#0"), Ok(("", Token::EntityRef(0))));
    }

    #[test]
    fn test_string_literal_keeps_escapes() {
        assert_eq!(string_literal("'hello'"), Ok(("", Token::String("hello"))));
        assert_eq!(string_literal("'it''s'"), Ok(("", Token::String("it''s"))));
        assert_eq!(string_literal("''"), Ok(("", Token::String(""))));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(integer("-42"), Ok(("", Token::Integer(-42))));
        assert_eq!(float("0."), Ok(("", Token::Float(0.0))));
        assert_eq!(float("1.5E-10"), Ok(("", Token::Float(1.5e-10))));
    }

    #[test]
    fn test_enum() {
        assert_eq!(enum_value(".T."), Ok(("", Token::Enum("T"))));
        assert_eq!(
            enum_value(".NOTDEFINED."),
            Ok(("", Token::Enum("NOTDEFINED")))
        );
    }

    #[test]
    fn test_nested_list() {
        let (_, token) = list("(1,(2,3),4)").unwrap();
        match token {
            Token::List(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(
                    items[1],
                    Token::List(vec![Token::Integer(2), Token::Integer(3)])
                );
            }
            _ => panic!("Expected List token"),
        }
    }

    #[test]
    fn test_parse_entity() {
        let input = "#123=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',#2,'Wall; A',$,$,$,$,$,.STANDARD.);";
        let (id, type_name, args) = parse_entity(input).unwrap();
        assert_eq!(id, 123);
        assert_eq!(type_name, "IFCWALL");
        assert_eq!(args.len(), 9);
        assert_eq!(args[2], Token::String("Wall; A"));
        assert_eq!(args[8], Token::Enum("STANDARD"));
    }

    #[test]
    fn test_parse_typed_value() {
        let input = "#7=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);";
        let (_, _, args) = parse_entity(input).unwrap();
        assert_eq!(
            args[2],
            Token::TypedValue("IFCBOOLEAN", vec![Token::Enum("T")])
        );
    }

    #[test]
    fn test_parse_entity_rejects_garbage() {
        assert!(parse_entity("#1=IFCWALL('unterminated);").is_err());
        assert!(parse_entity("IFCWALL();").is_err());
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(decode_string("it''s"), "it's");
        assert_eq!(decode_string("Livello \\X2\\00E8\\X0\\ 1"), "Livello è 1");
        assert_eq!(decode_string("caf\\X\\E9"), "café");
        assert_eq!(decode_string("plain"), "plain");
    }

    #[test]
    fn test_entity_scanner_skips_header_and_strings() {
        let content = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_NAME('model #1.ifc','2024-01-01T00:00:00',(''),(''),'','','');
FILE_SCHEMA(('IFC4X3_ADD2'));
ENDSEC;
DATA;
#1=IFCPROJECT('guid',$,'Project; #2=fake',$,$,$,$,$,$);
#2 = IFCWALL('guid2',$,$,$,$,$,$,$,$);
#3=IFCDOOR('guid3',$,$,$,$,$,$,$,$,$,$,$,$);
ENDSEC;
END-ISO-10303-21;
"#;

        let mut scanner = EntityScanner::new(content);
        let (id, type_name, _, _) = scanner.next_entity().unwrap();
        assert_eq!((id, type_name), (1, "IFCPROJECT"));
        let (id, type_name, start, end) = scanner.next_entity().unwrap();
        assert_eq!((id, type_name), (2, "IFCWALL"));
        assert!(parse_entity(&content[start..end]).is_ok());
        let (id, _, _, _) = scanner.next_entity().unwrap();
        assert_eq!(id, 3);
        assert!(scanner.next_entity().is_none());

        let header = parse_header(content);
        assert_eq!(header.schema_identifiers, vec!["IFC4X3_ADD2".to_string()]);
        assert_eq!(header.file_name.as_deref(), Some("model #1.ifc"));
        assert_eq!(header.description.len(), 1);
    }
}
