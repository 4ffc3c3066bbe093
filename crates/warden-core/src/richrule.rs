//! The rich-rule grammar: a pure `parse`/`serialize` pair producing and
//! consuming a [`RichRule`] value (spec.md §3, §8 property 5).
//!
//! Grammar (a faithful subset of firewalld's rich-rule language, recovered
//! from its documented shape since `original_source` only retained
//! `firewalld.py` and not `core/rich.py`):
//!
//! ```text
//! rule
//!   [family="ipv4"|"ipv6"]
//!   [source [not] address="<addr>"|mac="<mac>"|ipset="<set>"]
//!   [destination [not] address="<addr>"]
//!   [ service name="<name>"
//!   | port port="<port>" protocol="<proto>"
//!   | protocol value="<proto>"
//!   | icmp-block name="<name>"
//!   | masquerade
//!   | forward-port port="<port>" protocol="<proto>" to-port="<port>" to-addr="<addr>" ]
//!   [log [prefix="<p>"] [level="<l>"] [limit value="<v>"]]
//!   [audit [limit value="<v>"]]
//!   [accept|reject [type="<t>"]|drop|mark set="<m>"] [limit value="<v>"]
//! ```

use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RichRuleError {
    #[error("rich rule must start with 'rule'")]
    MissingRuleKeyword,
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unterminated quoted value starting at '{0}'")]
    UnterminatedQuote(String),
    #[error("'{key}' requires a quoted value (got '{got}')")]
    MissingValue { key: String, got: String },
    #[error("a rich rule needs exactly one element or bare action")]
    MissingElement,
    #[error("unknown family '{0}'")]
    UnknownFamily(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFamily {
    Ipv4,
    Ipv6,
}

impl fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    pub not: bool,
    pub address: Option<String>,
    pub mac: Option<String>,
    pub ipset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Limit {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Log {
    pub prefix: Option<String>,
    pub level: Option<String>,
    pub limit: Option<Limit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Audit {
    pub limit: Option<Limit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    None,
    Service { name: String },
    Port { port: String, protocol: String },
    Protocol { value: String },
    IcmpBlock { name: String },
    Masquerade,
    ForwardPort {
        port: String,
        protocol: String,
        to_port: String,
        to_addr: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Accept { limit: Option<Limit> },
    Reject { rtype: Option<String>, limit: Option<Limit> },
    Drop { limit: Option<Limit> },
    Mark { set: String, limit: Option<Limit> },
}

/// A parsed rich rule. Structural equality (and thus set membership within
/// a zone) is the derived `PartialEq` over every field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichRule {
    pub family: Option<RuleFamily>,
    pub source: Option<Selector>,
    pub destination: Option<Selector>,
    pub element: Element,
    pub log: Option<Log>,
    pub audit: Option<Audit>,
    pub action: Option<Action>,
}

/// Parse rich-rule text into a [`RichRule`].
///
/// # Errors
///
/// Returns [`RichRuleError`] if `text` is not well-formed rich-rule syntax.
pub fn parse(text: &str) -> Result<RichRule, RichRuleError> {
    let tokens = tokenize(text)?;
    let mut iter = tokens.iter().peekable();

    match iter.next() {
        Some(t) if t == "rule" => {}
        _ => return Err(RichRuleError::MissingRuleKeyword),
    }

    let mut family = None;
    let mut source = None;
    let mut destination = None;
    let mut element = Element::None;
    let mut log = None;
    let mut audit = None;
    let mut action = None;
    let mut trailing_limit = None;

    while let Some(tok) = iter.next() {
        if let Some((key, _)) = split_kv(tok) {
            if key == "family" {
                let value = expect_value(tok)?;
                family = Some(match value.as_str() {
                    "ipv4" => RuleFamily::Ipv4,
                    "ipv6" => RuleFamily::Ipv6,
                    other => return Err(RichRuleError::UnknownFamily(other.to_owned())),
                });
                continue;
            }
            if key == "limit" {
                trailing_limit = Some(Limit { value: expect_value(tok)? });
                continue;
            }
            return Err(RichRuleError::UnexpectedToken(tok.clone()));
        }

        match tok.as_str() {
            "source" => source = Some(parse_selector(&mut iter)?),
            "destination" => destination = Some(parse_selector(&mut iter)?),
            "service" => element = parse_service(&mut iter)?,
            "port" => element = parse_port(&mut iter)?,
            "protocol" => element = parse_protocol(&mut iter)?,
            "icmp-block" => element = parse_icmp_block(&mut iter)?,
            "masquerade" => element = Element::Masquerade,
            "forward-port" => element = parse_forward_port(&mut iter)?,
            "log" => log = Some(parse_log(&mut iter)?),
            "audit" => audit = Some(parse_audit(&mut iter)?),
            "accept" => action = Some(Action::Accept { limit: None }),
            "reject" => action = Some(parse_reject(&mut iter)?),
            "drop" => action = Some(Action::Drop { limit: None }),
            "mark" => action = Some(parse_mark(&mut iter)?),
            other => return Err(RichRuleError::UnexpectedToken(other.to_owned())),
        }
    }

    if let Some(limit) = trailing_limit {
        action = Some(attach_limit(action, limit));
    }

    if matches!(element, Element::None) && action.is_none() && log.is_none() && audit.is_none() {
        return Err(RichRuleError::MissingElement);
    }

    Ok(RichRule {
        family,
        source,
        destination,
        element,
        log,
        audit,
        action,
    })
}

fn attach_limit(action: Option<Action>, limit: Limit) -> Action {
    match action {
        Some(Action::Accept { .. }) => Action::Accept { limit: Some(limit) },
        Some(Action::Reject { rtype, .. }) => Action::Reject { rtype, limit: Some(limit) },
        Some(Action::Drop { .. }) => Action::Drop { limit: Some(limit) },
        Some(Action::Mark { set, .. }) => Action::Mark { set, limit: Some(limit) },
        None => Action::Accept { limit: Some(limit) },
    }
}

type Tokens<'a> = std::iter::Peekable<std::slice::Iter<'a, String>>;

fn parse_selector(iter: &mut Tokens) -> Result<Selector, RichRuleError> {
    let mut sel = Selector::default();
    loop {
        let Some(tok) = iter.peek().map(|t| (*t).clone()) else { break };
        if tok.as_str() == "not" {
            sel.not = true;
            iter.next();
            continue;
        }
        if let Some((key, _)) = split_kv(&tok) {
            match key {
                "address" => {
                    iter.next();
                    sel.address = Some(expect_value(&tok)?);
                }
                "mac" => {
                    iter.next();
                    sel.mac = Some(expect_value(&tok)?);
                }
                "ipset" => {
                    iter.next();
                    sel.ipset = Some(expect_value(&tok)?);
                }
                _ => break,
            }
            continue;
        }
        break;
    }
    Ok(sel)
}

fn parse_service(iter: &mut Tokens) -> Result<Element, RichRuleError> {
    let tok = iter
        .next()
        .ok_or_else(|| RichRuleError::MissingValue {
            key: "service".to_owned(),
            got: String::new(),
        })?;
    require_key(tok, "name")?;
    Ok(Element::Service { name: expect_value(tok)? })
}

fn parse_port(iter: &mut Tokens) -> Result<Element, RichRuleError> {
    let port_tok = iter.next().ok_or_else(|| RichRuleError::MissingValue {
        key: "port".to_owned(),
        got: String::new(),
    })?;
    require_key(port_tok, "port")?;
    let port = expect_value(port_tok)?;

    let proto_tok = iter.next().ok_or_else(|| RichRuleError::MissingValue {
        key: "protocol".to_owned(),
        got: String::new(),
    })?;
    require_key(proto_tok, "protocol")?;
    let protocol = expect_value(proto_tok)?;

    Ok(Element::Port { port, protocol })
}

fn parse_protocol(iter: &mut Tokens) -> Result<Element, RichRuleError> {
    let tok = iter.next().ok_or_else(|| RichRuleError::MissingValue {
        key: "value".to_owned(),
        got: String::new(),
    })?;
    require_key(tok, "value")?;
    Ok(Element::Protocol { value: expect_value(tok)? })
}

fn parse_icmp_block(iter: &mut Tokens) -> Result<Element, RichRuleError> {
    let tok = iter.next().ok_or_else(|| RichRuleError::MissingValue {
        key: "name".to_owned(),
        got: String::new(),
    })?;
    require_key(tok, "name")?;
    Ok(Element::IcmpBlock { name: expect_value(tok)? })
}

fn parse_forward_port(iter: &mut Tokens) -> Result<Element, RichRuleError> {
    let mut port = None;
    let mut protocol = None;
    let mut to_port = None;
    let mut to_addr = None;

    while let Some(tok) = iter.peek().map(|t| (*t).clone()) {
        let Some((key, _)) = split_kv(&tok) else { break };
        match key {
            "port" => {
                iter.next();
                port = Some(expect_value(&tok)?);
            }
            "protocol" => {
                iter.next();
                protocol = Some(expect_value(&tok)?);
            }
            "to-port" => {
                iter.next();
                to_port = Some(expect_value(&tok)?);
            }
            "to-addr" => {
                iter.next();
                to_addr = Some(expect_value(&tok)?);
            }
            _ => break,
        }
    }

    Ok(Element::ForwardPort {
        port: port.ok_or_else(|| RichRuleError::MissingValue {
            key: "port".to_owned(),
            got: "forward-port".to_owned(),
        })?,
        protocol: protocol.ok_or_else(|| RichRuleError::MissingValue {
            key: "protocol".to_owned(),
            got: "forward-port".to_owned(),
        })?,
        to_port: to_port.unwrap_or_default(),
        to_addr: to_addr.unwrap_or_default(),
    })
}

fn parse_log(iter: &mut Tokens) -> Result<Log, RichRuleError> {
    let mut log = Log::default();
    loop {
        let Some(tok) = iter.peek().map(|t| (*t).clone()) else { break };
        let Some((key, _)) = split_kv(&tok) else { break };
        match key {
            "prefix" => {
                iter.next();
                log.prefix = Some(expect_value(&tok)?);
            }
            "level" => {
                iter.next();
                log.level = Some(expect_value(&tok)?);
            }
            "limit" => {
                iter.next();
                log.limit = Some(Limit { value: expect_value(&tok)? });
            }
            _ => break,
        }
    }
    Ok(log)
}

fn parse_audit(iter: &mut Tokens) -> Result<Audit, RichRuleError> {
    let mut audit = Audit::default();
    if let Some(tok) = iter.peek().map(|t| (*t).clone()) {
        if let Some(("limit", _)) = split_kv(&tok) {
            iter.next();
            audit.limit = Some(Limit { value: expect_value(&tok)? });
        }
    }
    Ok(audit)
}

fn parse_reject(iter: &mut Tokens) -> Result<Action, RichRuleError> {
    let mut rtype = None;
    if let Some(tok) = iter.peek().map(|t| (*t).clone()) {
        if let Some(("type", _)) = split_kv(&tok) {
            iter.next();
            rtype = Some(expect_value(&tok)?);
        }
    }
    Ok(Action::Reject { rtype, limit: None })
}

fn parse_mark(iter: &mut Tokens) -> Result<Action, RichRuleError> {
    let tok = iter.next().ok_or_else(|| RichRuleError::MissingValue {
        key: "set".to_owned(),
        got: "mark".to_owned(),
    })?;
    require_key(tok, "set")?;
    Ok(Action::Mark { set: expect_value(tok)?, limit: None })
}

fn require_key(tok: &str, expected: &str) -> Result<(), RichRuleError> {
    match split_kv(tok) {
        Some((key, _)) if key == expected => Ok(()),
        _ => Err(RichRuleError::MissingValue {
            key: expected.to_owned(),
            got: tok.to_owned(),
        }),
    }
}

fn split_kv(tok: &str) -> Option<(&str, &str)> {
    tok.split_once('=')
}

fn expect_value(tok: &str) -> Result<String, RichRuleError> {
    let (key, raw) = split_kv(tok).ok_or_else(|| RichRuleError::MissingValue {
        key: tok.to_owned(),
        got: tok.to_owned(),
    })?;
    let trimmed = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| RichRuleError::MissingValue {
            key: key.to_owned(),
            got: raw.to_owned(),
        })?;
    Ok(trimmed.to_owned())
}

/// Split rich-rule text into tokens, keeping `key="quoted value"` pairs
/// (which may contain spaces) intact as a single token.
fn tokenize(text: &str) -> Result<Vec<String>, RichRuleError> {
    let mut tokens = Vec::new();
    let mut chars = text.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut tok = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            tok.push(c);
            chars.next();
            if c == '"' {
                // We just consumed the opening quote of a value; keep
                // consuming until the closing quote, including spaces.
                let mut closed = false;
                for c in chars.by_ref() {
                    tok.push(c);
                    if c == '"' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(RichRuleError::UnterminatedQuote(tok));
                }
                break;
            }
        }
        tokens.push(tok);
    }

    Ok(tokens)
}

impl fmt::Display for RichRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule")?;
        if let Some(family) = self.family {
            write!(f, " family=\"{family}\"")?;
        }
        if let Some(ref sel) = self.source {
            write!(f, " source{}", fmt_selector(sel))?;
        }
        if let Some(ref sel) = self.destination {
            write!(f, " destination{}", fmt_selector(sel))?;
        }
        match &self.element {
            Element::None => {}
            Element::Service { name } => write!(f, " service name=\"{name}\"")?,
            Element::Port { port, protocol } => {
                write!(f, " port port=\"{port}\" protocol=\"{protocol}\"")?;
            }
            Element::Protocol { value } => write!(f, " protocol value=\"{value}\"")?,
            Element::IcmpBlock { name } => write!(f, " icmp-block name=\"{name}\"")?,
            Element::Masquerade => write!(f, " masquerade")?,
            Element::ForwardPort { port, protocol, to_port, to_addr } => {
                write!(f, " forward-port port=\"{port}\" protocol=\"{protocol}\"")?;
                if !to_port.is_empty() {
                    write!(f, " to-port=\"{to_port}\"")?;
                }
                if !to_addr.is_empty() {
                    write!(f, " to-addr=\"{to_addr}\"")?;
                }
            }
        }
        if let Some(ref log) = self.log {
            write!(f, " log")?;
            if let Some(ref prefix) = log.prefix {
                write!(f, " prefix=\"{prefix}\"")?;
            }
            if let Some(ref level) = log.level {
                write!(f, " level=\"{level}\"")?;
            }
            if let Some(ref limit) = log.limit {
                write!(f, " limit value=\"{}\"", limit.value)?;
            }
        }
        if let Some(ref audit) = self.audit {
            write!(f, " audit")?;
            if let Some(ref limit) = audit.limit {
                write!(f, " limit value=\"{}\"", limit.value)?;
            }
        }
        match &self.action {
            None => {}
            Some(Action::Accept { limit }) => {
                write!(f, " accept")?;
                fmt_action_limit(f, limit)?;
            }
            Some(Action::Reject { rtype, limit }) => {
                write!(f, " reject")?;
                if let Some(rtype) = rtype {
                    write!(f, " type=\"{rtype}\"")?;
                }
                fmt_action_limit(f, limit)?;
            }
            Some(Action::Drop { limit }) => {
                write!(f, " drop")?;
                fmt_action_limit(f, limit)?;
            }
            Some(Action::Mark { set, limit }) => {
                write!(f, " mark set=\"{set}\"")?;
                fmt_action_limit(f, limit)?;
            }
        }
        Ok(())
    }
}

fn fmt_action_limit(f: &mut fmt::Formatter<'_>, limit: &Option<Limit>) -> fmt::Result {
    if let Some(limit) = limit {
        write!(f, " limit value=\"{}\"", limit.value)?;
    }
    Ok(())
}

fn fmt_selector(sel: &Selector) -> String {
    let mut s = String::new();
    if sel.not {
        s.push_str(" not");
    }
    if let Some(ref addr) = sel.address {
        s.push_str(&format!(" address=\"{addr}\""));
    }
    if let Some(ref mac) = sel.mac {
        s.push_str(&format!(" mac=\"{mac}\""));
    }
    if let Some(ref ipset) = sel.ipset {
        s.push_str(&format!(" ipset=\"{ipset}\""));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_service_accept() {
        let rule = parse(r#"rule family="ipv4" source address="192.168.1.0/24" service name="ftp" accept"#).unwrap();
        assert_eq!(rule.family, Some(RuleFamily::Ipv4));
        assert_eq!(rule.element, Element::Service { name: "ftp".to_owned() });
        assert_eq!(rule.action, Some(Action::Accept { limit: None }));
    }

    #[test]
    fn parse_reject_with_type() {
        let rule = parse(r#"rule service name="telnet" reject type="icmp-host-prohibited""#).unwrap();
        match rule.action {
            Some(Action::Reject { rtype: Some(t), .. }) => assert_eq!(t, "icmp-host-prohibited"),
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn parse_not_source() {
        let rule = parse(r#"rule source not address="10.0.0.0/8" service name="ssh" drop"#).unwrap();
        let source = rule.source.unwrap();
        assert!(source.not);
        assert_eq!(source.address.as_deref(), Some("10.0.0.0/8"));
    }

    #[test]
    fn parse_log_and_audit() {
        let rule = parse(
            r#"rule service name="ssh" log prefix="SSH " level="info" limit value="1/m" audit accept"#,
        )
        .unwrap();
        let log = rule.log.unwrap();
        assert_eq!(log.prefix.as_deref(), Some("SSH "));
        assert_eq!(log.level.as_deref(), Some("info"));
        assert!(rule.audit.is_some());
    }

    #[test]
    fn parse_forward_port() {
        let rule = parse(
            r#"rule forward-port port="80" protocol="tcp" to-port="8080" to-addr="10.0.0.1""#,
        )
        .unwrap();
        assert_eq!(
            rule.element,
            Element::ForwardPort {
                port: "80".to_owned(),
                protocol: "tcp".to_owned(),
                to_port: "8080".to_owned(),
                to_addr: "10.0.0.1".to_owned(),
            }
        );
    }

    #[test]
    fn missing_rule_keyword_is_an_error() {
        let err = parse("family=\"ipv4\" accept").unwrap_err();
        assert_eq!(err, RichRuleError::MissingRuleKeyword);
    }

    #[test]
    fn round_trip_is_stable() {
        let samples = [
            r#"rule family="ipv4" source address="192.168.1.0/24" service name="ftp" accept"#,
            r#"rule service name="telnet" reject type="icmp-host-prohibited""#,
            r#"rule source not address="10.0.0.0/8" service name="ssh" drop"#,
            r#"rule port port="80" protocol="tcp" accept"#,
            r#"rule protocol value="esp" accept"#,
            r#"rule icmp-block name="echo-request""#,
            r#"rule forward-port port="80" protocol="tcp" to-port="8080" to-addr="10.0.0.1""#,
            r#"rule mark set="0x10""#,
        ];
        for s in samples {
            let first = parse(s).unwrap();
            let serialized = first.to_string();
            let second = parse(&serialized).unwrap();
            assert_eq!(first, second, "round trip mismatch for {s}");
        }
    }
}
