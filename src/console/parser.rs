//! Line grammar of the interpreter.
//!
//! Two surface syntaxes are accepted and reduced to the same [`Command`]:
//! `verb Type id attr value` and the dotted-call form `Type.verb("id", ...)`.
//! Class names and ids are kept as typed by the user; checking them against the known
//! kinds and the working set is left to the interpreter so it can report the right
//! diagnostic.

use crate::errors::{Error, Result};
use serde_json::{Map, Number, Value};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Blank line
    Empty,
    /// `quit`
    Quit,
    /// End of input
    Eof,
    /// `help [topic]`
    Help(Option<String>),
    /// `create Type [key=value ...]`
    Create {
        class: Option<String>,
        params: Vec<(String, Value)>,
    },
    /// `show Type id`
    Show {
        class: Option<String>,
        id: Option<String>,
    },
    /// `destroy Type id`
    Destroy {
        class: Option<String>,
        id: Option<String>,
    },
    /// `all [Type]`
    All { class: Option<String> },
    /// `count Type`
    Count { class: Option<String> },
    /// `update Type id attr value`
    Update {
        class: Option<String>,
        id: Option<String>,
        attribute: Option<String>,
        value: Option<Value>,
    },
    /// `Type.update("id", {...})`
    UpdateMany {
        class: String,
        id: String,
        attributes: Map<String, Value>,
    },
    /// Anything else, carrying the input line
    Unknown(String),
}

/// A whitespace-separated word, with surrounding double quotes kept.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    raw: String,
}

impl Token {
    fn is_quoted(&self) -> bool {
        self.raw.len() >= 2 && self.raw.starts_with('"') && self.raw.ends_with('"')
    }

    /// Text with one level of quoting and `\"` escapes removed.
    fn text(&self) -> String {
        if self.is_quoted() {
            self.raw[1..self.raw.len() - 1].replace("\\\"", "\"")
        } else {
            self.raw.clone()
        }
    }
}

/// Splits on whitespace outside double quotes. Quotes stay in the token.
fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                current.push(c);
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(Token {
                        raw: std::mem::take(&mut current),
                    });
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(Token { raw: current });
    }
    tokens
}

/// Value of a `key=value` parameter to `create`.
///
/// Quoted values become strings with `_` read as a space; bare values must be an
/// integer or a float. Anything else yields `None` and the parameter is skipped.
#[must_use]
pub fn parse_param_value(raw: &str) -> Option<Value> {
    let token = Token {
        raw: raw.to_string(),
    };
    if token.is_quoted() {
        return Some(Value::String(token.text().replace('_', " ")));
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::from(int));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Value given to `update`: quoted text stays a string, bare text is tried as an
/// integer, then a float, and is otherwise kept verbatim.
#[must_use]
pub fn parse_update_value(raw: &str, quoted: bool) -> Value {
    if quoted {
        return Value::String(raw.to_string());
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(raw.to_string()), Value::Number)
}

fn create_params(tokens: &[Token]) -> Vec<(String, Value)> {
    tokens
        .iter()
        .filter_map(|token| {
            let (key, value) = token.raw.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), parse_param_value(value)?))
        })
        .collect()
}

fn nth_text(tokens: &[Token], n: usize) -> Option<String> {
    tokens.get(n).map(Token::text)
}

/// Parses one input line.
///
/// # Errors
/// Returns [`Error::Parse`] when a dotted `update` carries a malformed dictionary.
pub fn parse_line(line: &str) -> Result<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Command::Empty);
    }
    if let Some(command) = parse_dotted(trimmed)? {
        return Ok(command);
    }

    let tokens = tokenize(trimmed);
    let Some((verb, args)) = tokens.split_first() else {
        return Ok(Command::Empty);
    };
    let class = nth_text(args, 0);
    Ok(match verb.raw.as_str() {
        "quit" => Command::Quit,
        "EOF" => Command::Eof,
        "help" => Command::Help(class),
        "create" => Command::Create {
            class,
            params: create_params(args.get(1..).unwrap_or_default()),
        },
        "show" => Command::Show {
            class,
            id: nth_text(args, 1),
        },
        "destroy" => Command::Destroy {
            class,
            id: nth_text(args, 1),
        },
        "all" => Command::All { class },
        "count" => Command::Count { class },
        "update" => Command::Update {
            class,
            id: nth_text(args, 1),
            attribute: nth_text(args, 2),
            value: args
                .get(3)
                .map(|token| parse_update_value(&token.text(), token.is_quoted())),
        },
        _ => Command::Unknown(trimmed.to_string()),
    })
}

/// Splits `a, "b, c", d` on commas outside quotes.
fn split_call_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote = None;
    for c in input.chars() {
        match (c, quote) {
            ('"' | '\'', None) => {
                quote = Some(c);
                current.push(c);
            }
            (c, Some(q)) if c == q => {
                quote = None;
                current.push(c);
            }
            (',', None) => args.push(std::mem::take(&mut current)),
            (c, _) => current.push(c),
        }
    }
    args.push(current);
    args.into_iter()
        .map(|arg| arg.trim().to_string())
        .filter(|arg| !arg.is_empty())
        .collect()
}

fn strip_call_quotes(arg: &str) -> (String, bool) {
    for q in ['"', '\''] {
        if arg.len() >= 2 && arg.starts_with(q) && arg.ends_with(q) {
            return (arg[1..arg.len() - 1].to_string(), true);
        }
    }
    (arg.to_string(), false)
}

/// Recognises `Type.method(args)`. Returns `Ok(None)` for lines of any other shape.
fn parse_dotted(line: &str) -> Result<Option<Command>> {
    let Some((class, call)) = line.split_once('.') else {
        return Ok(None);
    };
    if class.is_empty() || !class.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Ok(None);
    }
    let Some((method, rest)) = call.split_once('(') else {
        return Ok(None);
    };
    let Some(inner) = rest.strip_suffix(')') else {
        return Ok(None);
    };

    let class = Some(class.to_string());
    let args = split_call_args(inner);
    let arg = |n: usize| args.get(n).map(|a| strip_call_quotes(a).0);

    Ok(Some(match method.trim() {
        "all" => Command::All { class },
        "count" => Command::Count { class },
        "show" => Command::Show { class, id: arg(0) },
        "destroy" => Command::Destroy { class, id: arg(0) },
        "update" => {
            if let Some((head, dict)) = inner.split_once('{') {
                let id = split_call_args(head)
                    .first()
                    .map(|a| strip_call_quotes(a).0)
                    .unwrap_or_default();
                Command::UpdateMany {
                    class: class.unwrap_or_default(),
                    id,
                    attributes: parse_dict(&format!("{{{dict}"))?,
                }
            } else {
                Command::Update {
                    class,
                    id: arg(0),
                    attribute: arg(1),
                    value: args.get(2).map(|a| {
                        let (text, quoted) = strip_call_quotes(a);
                        parse_update_value(&text, quoted)
                    }),
                }
            }
        }
        _ => Command::Unknown(line.to_string()),
    }))
}

/// Cursor over a Python-style dictionary literal.
struct Literal<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl Literal<'_> {
    fn error(message: impl Into<String>) -> Error {
        Error::Parse {
            message: message.into(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn expect(&mut self, wanted: char) -> Result<()> {
        self.skip_ws();
        match self.chars.next() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(Self::error(format!("expected `{wanted}`, found `{c}`"))),
            None => Err(Self::error(format!("expected `{wanted}`, found end of input"))),
        }
    }

    fn string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some('\\') => match self.chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(Self::error("unterminated string literal"))
    }

    fn word(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self
            .chars
            .next_if(|c| c.is_alphanumeric() || matches!(*c, '-' | '+' | '.' | '_'))
        {
            out.push(c);
        }
        out
    }

    fn value(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.chars.peek().copied() {
            Some(q @ ('"' | '\'')) => {
                self.chars.next();
                Ok(Value::String(self.string(q)?))
            }
            Some(_) => {
                let word = self.word();
                match word.as_str() {
                    "True" => Ok(Value::Bool(true)),
                    "False" => Ok(Value::Bool(false)),
                    "None" => Ok(Value::Null),
                    _ => {
                        if let Ok(int) = word.parse::<i64>() {
                            return Ok(Value::from(int));
                        }
                        word.parse::<f64>()
                            .ok()
                            .and_then(Number::from_f64)
                            .map(Value::Number)
                            .ok_or_else(|| Self::error(format!("invalid literal `{word}`")))
                    }
                }
            }
            None => Err(Self::error("expected a value, found end of input")),
        }
    }

    fn key(&mut self) -> Result<String> {
        self.skip_ws();
        match self.chars.next() {
            Some(q @ ('"' | '\'')) => self.string(q),
            _ => Err(Self::error("dictionary keys must be quoted strings")),
        }
    }
}

/// Parses a flat dictionary literal such as `{ 'name': "amne", 'rooms': 3 }`.
///
/// # Errors
/// Returns [`Error::Parse`] describing the first malformed token.
pub fn parse_dict(input: &str) -> Result<Map<String, Value>> {
    let mut literal = Literal {
        chars: input.chars().peekable(),
    };
    let mut map = Map::new();
    literal.expect('{')?;
    literal.skip_ws();
    if literal.chars.next_if_eq(&'}').is_none() {
        loop {
            let key = literal.key()?;
            literal.expect(':')?;
            let value = literal.value()?;
            map.insert(key, value);
            literal.skip_ws();
            match literal.chars.next() {
                Some(',') => {
                    literal.skip_ws();
                    if literal.chars.next_if_eq(&'}').is_some() {
                        break;
                    }
                }
                Some('}') => break,
                _ => return Err(Literal::error("expected `,` or `}` in dictionary")),
            }
        }
    }
    literal.skip_ws();
    if let Some(c) = literal.chars.next() {
        return Err(Literal::error(format!("unexpected `{c}` after dictionary")));
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_commands() {
        assert_eq!(parse_line("   ").unwrap(), Command::Empty);
        assert_eq!(parse_line("quit").unwrap(), Command::Quit);
        assert_eq!(
            parse_line("show BaseModel 1234").unwrap(),
            Command::Show {
                class: Some("BaseModel".to_string()),
                id: Some("1234".to_string()),
            }
        );
        assert_eq!(parse_line("all").unwrap(), Command::All { class: None });
        assert_eq!(
            parse_line("frobnicate State").unwrap(),
            Command::Unknown("frobnicate State".to_string())
        );
    }

    #[test]
    fn test_create_params() {
        let Command::Create { class, params } = parse_line(
            r#"create Place name="My_little_house" number_rooms=4 latitude=37.77 bad=abc noval= flag"#,
        )
        .unwrap() else {
            panic!("not a create");
        };
        assert_eq!(class.as_deref(), Some("Place"));
        assert_eq!(
            params,
            vec![
                ("name".to_string(), json!("My little house")),
                ("number_rooms".to_string(), json!(4)),
                ("latitude".to_string(), json!(37.77)),
            ]
        );
    }

    #[test]
    fn test_create_quoted_value_with_space_and_escape() {
        let Command::Create { params, .. } =
            parse_line(r#"create Review text="Good \"big\" Review""#).unwrap()
        else {
            panic!("not a create");
        };
        assert_eq!(params, vec![("text".to_string(), json!("Good \"big\" Review"))]);
    }

    #[test]
    fn test_update_value_types() {
        let Command::Update {
            attribute, value, ..
        } = parse_line("update Place 42 number_rooms 3").unwrap()
        else {
            panic!("not an update");
        };
        assert_eq!(attribute.as_deref(), Some("number_rooms"));
        assert_eq!(value, Some(json!(3)));

        assert_eq!(parse_update_value("3", true), json!("3"));
        assert_eq!(parse_update_value("1.5", false), json!(1.5));
        assert_eq!(parse_update_value("example_state", false), json!("example_state"));
    }

    #[test]
    fn test_dotted_calls() {
        assert_eq!(
            parse_line("User.count()").unwrap(),
            Command::Count {
                class: Some("User".to_string())
            }
        );
        assert_eq!(
            parse_line(r#"User.show("abc")"#).unwrap(),
            Command::Show {
                class: Some("User".to_string()),
                id: Some("abc".to_string()),
            }
        );
        assert_eq!(
            parse_line("BModel.destroy()").unwrap(),
            Command::Destroy {
                class: Some("BModel".to_string()),
                id: None,
            }
        );
        assert_eq!(
            parse_line(r#"Review.update("r1", "rev_k", "rev_v")"#).unwrap(),
            Command::Update {
                class: Some("Review".to_string()),
                id: Some("r1".to_string()),
                attribute: Some("rev_k".to_string()),
                value: Some(json!("rev_v")),
            }
        );
        assert!(matches!(
            parse_line("State.explode()").unwrap(),
            Command::Unknown(_)
        ));
    }

    #[test]
    fn test_dotted_update_with_dict() {
        let command =
            parse_line(r#"Amenity.update("a1", { 'name' : 'amne', 'rev_k' : 'rev_v' })"#).unwrap();
        let Command::UpdateMany {
            class,
            id,
            attributes,
        } = command
        else {
            panic!("not a dict update");
        };
        assert_eq!(class, "Amenity");
        assert_eq!(id, "a1");
        assert_eq!(attributes["name"], json!("amne"));
        assert_eq!(attributes["rev_k"], json!("rev_v"));
    }

    #[test]
    fn test_dict_literals() {
        let dict = parse_dict(r#"{"rooms": 3, 'price': 9.5, 'pets': True, 'note': None,}"#).unwrap();
        assert_eq!(
            Value::Object(dict),
            json!({"rooms": 3, "price": 9.5, "pets": true, "note": null})
        );
        assert!(parse_dict("{}").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_dict_is_a_parse_error() {
        for input in ["{'name' 'x'}", "{'name': }", "{name: 'x'}", "{'a': 1", "{'a': 'x}"] {
            let err = parse_dict(input).unwrap_err();
            assert!(matches!(err, Error::Parse { message: _ }), "{input}");
        }
        assert!(parse_line(r#"Place.update("p", {'a': oops})"#).is_err());
    }
}
