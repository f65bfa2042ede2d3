//! Recursive-descent parser for the interaction-script mini-language:
//! `click #id`, `key <chord>`, `wait 0`, and `repeat N { ... }` with
//! `N <= 20` and nesting `<= 4`.

use serde::{Deserialize, Serialize};

use crate::reason::probe as r_probe;

/// One parsed interaction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// `click #<id>`
    Click { id: String },
    /// `key <chord>`
    Key { chord: String },
    /// `wait 0`
    Wait,
    /// `repeat N { steps }`
    Repeat { count: u32, steps: Vec<Step> },
}

/// A parsed, bounded interaction script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    /// Top-level steps, in source order.
    pub steps: Vec<Step>,
}

const MAX_REPEAT: u32 = 20;
const MAX_NESTING: usize = 4;

struct Parser<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

fn tokenize(src: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = src;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if let Some(stripped) = rest.strip_prefix('{') {
            tokens.push("{");
            rest = stripped;
            continue;
        }
        if let Some(stripped) = rest.strip_prefix('}') {
            tokens.push("}");
            rest = stripped;
            continue;
        }
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '{' || c == '}')
            .unwrap_or(rest.len());
        let (tok, remainder) = rest.split_at(end.max(1));
        tokens.push(tok);
        rest = remainder;
    }
    tokens
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<&'a str> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_block(&mut self, depth: usize, limit: &mut usize) -> Result<Vec<Step>, &'static str> {
        if depth > MAX_NESTING {
            return Err(r_probe::SCRIPT_NESTING_TOO_DEEP);
        }
        let mut steps = Vec::new();
        while let Some(tok) = self.peek() {
            if tok == "}" {
                break;
            }
            if *limit == 0 {
                return Err(r_probe::SCRIPT_PARSE_ERROR);
            }
            *limit -= 1;
            steps.push(self.parse_step(depth, limit)?);
        }
        Ok(steps)
    }

    fn parse_step(&mut self, depth: usize, limit: &mut usize) -> Result<Step, &'static str> {
        let keyword = self.next().ok_or(r_probe::SCRIPT_PARSE_ERROR)?;
        match keyword {
            "click" => {
                let target = self.next().ok_or(r_probe::SCRIPT_PARSE_ERROR)?;
                let id = target.strip_prefix('#').ok_or(r_probe::SCRIPT_PARSE_ERROR)?;
                Ok(Step::Click { id: id.to_string() })
            }
            "key" => {
                let chord = self.next().ok_or(r_probe::SCRIPT_PARSE_ERROR)?;
                Ok(Step::Key { chord: chord.to_string() })
            }
            "wait" => {
                let arg = self.next().ok_or(r_probe::SCRIPT_PARSE_ERROR)?;
                if arg != "0" {
                    return Err(r_probe::SCRIPT_PARSE_ERROR);
                }
                Ok(Step::Wait)
            }
            "repeat" => {
                let n_tok = self.next().ok_or(r_probe::SCRIPT_PARSE_ERROR)?;
                let count: u32 = n_tok.parse().map_err(|_| r_probe::SCRIPT_REPEAT_COUNT_INVALID)?;
                if count == 0 || count > MAX_REPEAT {
                    return Err(r_probe::SCRIPT_REPEAT_COUNT_INVALID);
                }
                if self.next() != Some("{") {
                    return Err(r_probe::SCRIPT_PARSE_ERROR);
                }
                let steps = self.parse_block(depth + 1, limit)?;
                if self.next() != Some("}") {
                    return Err(r_probe::SCRIPT_PARSE_ERROR);
                }
                Ok(Step::Repeat { count, steps })
            }
            _ => Err(r_probe::SCRIPT_PARSE_ERROR),
        }
    }
}

/// Parse `src` into a [`Script`], bounded by `max_bytes` and `max_steps`
/// (applied to the flattened top-level + nested step count before
/// `repeat` multiplication — a `repeat 20 { ... }` still counts its body
/// once per textual step, not 20 times, since the bound exists to keep
/// parsing itself cheap).
///
/// # Errors
///
/// Returns the `SCRIPT_*`/reason code string on any parse failure.
pub fn parse(src: &str, max_bytes: usize, max_steps: usize) -> Result<Script, &'static str> {
    if src.len() > max_bytes {
        return Err(r_probe::SCRIPT_TOO_LARGE);
    }
    let tokens = tokenize(src);
    let mut parser = Parser { tokens, pos: 0 };
    let mut limit = max_steps;
    let steps = parser.parse_block(0, &mut limit)?;
    if parser.pos != parser.tokens.len() {
        return Err(r_probe::SCRIPT_PARSE_ERROR);
    }
    Ok(Script { steps })
}

/// Count the total number of steps a script would execute if `repeat`
/// blocks were fully unrolled, capping the walk at `max_steps + 1` so a
/// pathological nested-repeat script cannot blow up this accounting pass
/// itself.
#[must_use]
pub fn unrolled_step_count(script: &Script, max_steps: usize) -> usize {
    fn walk(steps: &[Step], cap: usize, acc: &mut usize) {
        for step in steps {
            if *acc > cap {
                return;
            }
            match step {
                Step::Repeat { count, steps } => {
                    for _ in 0..*count {
                        walk(steps, cap, acc);
                        if *acc > cap {
                            return;
                        }
                    }
                }
                _ => *acc += 1,
            }
        }
    }
    let mut acc = 0;
    walk(&script.steps, max_steps + 1, &mut acc);
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_steps() {
        let script = parse("click #go\nkey Enter\nwait 0", 1024, 100).unwrap();
        assert_eq!(
            script.steps,
            vec![
                Step::Click { id: "go".into() },
                Step::Key { chord: "Enter".into() },
                Step::Wait,
            ]
        );
    }

    #[test]
    fn parses_repeat_block() {
        let script = parse("repeat 3 { click #a wait 0 }", 1024, 100).unwrap();
        assert_eq!(script.steps.len(), 1);
        match &script.steps[0] {
            Step::Repeat { count, steps } => {
                assert_eq!(*count, 3);
                assert_eq!(steps.len(), 2);
            }
            _ => panic!("expected repeat"),
        }
    }

    #[test]
    fn rejects_repeat_over_limit() {
        let err = parse("repeat 21 { wait 0 }", 1024, 100).unwrap_err();
        assert_eq!(err, r_probe::SCRIPT_REPEAT_COUNT_INVALID);
    }

    #[test]
    fn rejects_nesting_over_limit() {
        let src = "repeat 1 { repeat 1 { repeat 1 { repeat 1 { repeat 1 { wait 0 } } } } }";
        let err = parse(src, 1024, 100).unwrap_err();
        assert_eq!(err, r_probe::SCRIPT_NESTING_TOO_DEEP);
    }

    #[test]
    fn rejects_unknown_keyword() {
        assert!(parse("dance #a", 1024, 100).is_err());
    }

    #[test]
    fn rejects_oversize_script() {
        let err = parse("wait 0", 2, 100).unwrap_err();
        assert_eq!(err, r_probe::SCRIPT_TOO_LARGE);
    }

    #[test]
    fn unrolled_count_multiplies_repeat() {
        let script = parse("repeat 3 { click #a wait 0 }", 1024, 100).unwrap();
        assert_eq!(unrolled_step_count(&script, 100), 6);
    }
}
