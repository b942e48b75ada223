//! Minimal XML-RPC encoding for the rTorrent adapter.
//!
//! Covers the value types rTorrent actually sends back; dates and base64
//! payloads are kept as their raw text.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// An XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
    Nil,
}

impl Value {
    /// Build a struct value from name/value pairs
    pub fn structure<I, K>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Struct(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a struct member by name
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    fn write(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Int(i) => {
                let tag = if i32::try_from(*i).is_ok() { "i4" } else { "i8" };
                out.push_str(&format!("<{tag}>{i}</{tag}>"));
            }
            Value::Bool(b) => {
                out.push_str(if *b {
                    "<boolean>1</boolean>"
                } else {
                    "<boolean>0</boolean>"
                });
            }
            Value::Double(d) => out.push_str(&format!("<double>{d}</double>")),
            Value::String(s) => {
                out.push_str("<string>");
                out.push_str(&escape(s.as_str()));
                out.push_str("</string>");
            }
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write(out);
                }
                out.push_str("</data></array>");
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    out.push_str("<member><name>");
                    out.push_str(&escape(name.as_str()));
                    out.push_str("</name>");
                    value.write(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Value::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

/// XML-RPC decoding failures
#[derive(Debug, Error)]
pub enum XmlRpcError {
    #[error("Invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed XML-RPC response: {0}")]
    Malformed(String),

    #[error("XML-RPC fault {code}: {message}")]
    Fault { code: i64, message: String },
}

/// Encode a `methodCall` document
pub fn method_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from(r#"<?xml version="1.0"?><methodCall><methodName>"#);
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        param.write(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Decode a `methodResponse` document; a fault becomes [`XmlRpcError::Fault`]
pub fn parse_response(xml: &str) -> Result<Value, XmlRpcError> {
    let mut parser = Parser::new(tokenize(xml)?);

    parser.open("methodResponse")?;
    if parser.at_open("fault") {
        parser.open("fault")?;
        let fault = parser.value()?;
        return Err(XmlRpcError::Fault {
            code: match fault.member("faultCode") {
                Some(Value::Int(code)) => *code,
                _ => 0,
            },
            message: fault
                .member("faultString")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    parser.open("params")?;
    parser.open("param")?;
    let value = parser.value()?;
    parser.close("param")?;
    parser.close("params")?;
    parser.close("methodResponse")?;
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open(String),
    Close(String),
    Text(String),
}

fn tokenize(xml: &str) -> Result<Vec<Token>, XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut tokens = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => tokens.push(Token::Open(tag_name(e.name().as_ref()))),
            Event::End(e) => tokens.push(Token::Close(tag_name(e.name().as_ref()))),
            Event::Empty(e) => {
                let name = tag_name(e.name().as_ref());
                tokens.push(Token::Open(name.clone()));
                tokens.push(Token::Close(name));
            }
            Event::Text(t) => tokens.push(Token::Text(t.unescape()?.into_owned())),
            Event::CData(c) => {
                tokens.push(Token::Text(String::from_utf8_lossy(&c.into_inner()).into_owned()))
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(tokens)
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn at_open(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Open(n)) if n == name)
    }

    fn at_close(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Close(n)) if n == name)
    }

    fn unexpected(&self, expected: &str) -> XmlRpcError {
        XmlRpcError::Malformed(format!("expected {}, found {:?}", expected, self.peek()))
    }

    fn open(&mut self, name: &str) -> Result<(), XmlRpcError> {
        if !self.at_open(name) {
            return Err(self.unexpected(&format!("<{}>", name)));
        }
        self.pos += 1;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), XmlRpcError> {
        if !self.at_close(name) {
            return Err(self.unexpected(&format!("</{}>", name)));
        }
        self.pos += 1;
        Ok(())
    }

    /// Consume text if present; missing text is an empty string
    fn text(&mut self) -> String {
        match self.tokens.get(self.pos) {
            Some(Token::Text(t)) => {
                self.pos += 1;
                t.clone()
            }
            _ => String::new(),
        }
    }

    fn value(&mut self) -> Result<Value, XmlRpcError> {
        self.open("value")?;

        let value = match self.peek().cloned() {
            Some(Token::Text(_)) => Value::String(self.text()),
            Some(Token::Close(n)) if n == "value" => Value::String(String::new()),
            Some(Token::Open(ty)) => {
                self.pos += 1;
                let value = self.typed(&ty)?;
                self.close(&ty)?;
                value
            }
            _ => return Err(self.unexpected("a value")),
        };

        self.close("value")?;
        Ok(value)
    }

    fn typed(&mut self, ty: &str) -> Result<Value, XmlRpcError> {
        let value = match ty {
            "string" | "base64" | "dateTime.iso8601" => Value::String(self.text()),
            "int" | "i4" | "i8" => {
                let text = self.text();
                Value::Int(text.trim().parse().map_err(|_| {
                    XmlRpcError::Malformed(format!("invalid integer '{}'", text))
                })?)
            }
            "double" => {
                let text = self.text();
                Value::Double(text.trim().parse().map_err(|_| {
                    XmlRpcError::Malformed(format!("invalid double '{}'", text))
                })?)
            }
            "boolean" => match self.text().trim() {
                "1" => Value::Bool(true),
                "0" => Value::Bool(false),
                other => return Err(XmlRpcError::Malformed(format!("invalid boolean '{}'", other))),
            },
            "nil" => Value::Nil,
            "array" => {
                self.open("data")?;
                let mut items = Vec::new();
                while self.at_open("value") {
                    items.push(self.value()?);
                }
                self.close("data")?;
                Value::Array(items)
            }
            "struct" => {
                let mut members = Vec::new();
                while self.at_open("member") {
                    self.open("member")?;
                    self.open("name")?;
                    let name = self.text();
                    self.close("name")?;
                    let value = self.value()?;
                    self.close("member")?;
                    members.push((name, value));
                }
                Value::Struct(members)
            }
            other => return Err(XmlRpcError::Malformed(format!("unknown type <{}>", other))),
        };
        Ok(value)
    }
}
