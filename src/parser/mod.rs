/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Lexical front end (spec.md §4.4). Parses one logical file's text into
//! [`SourceLine`]s; preprocessing (conditional compilation, `.include`
//! expansion) and symbol resolution happen afterwards, in
//! [`crate::assembler`].

use crate::ast::*;
use crate::errors::{AssemblyError, SourcePos};
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use std::path::Path;

#[derive(Parser)]
#[grammar = "./grammar.pest"]
struct SpectParser;

/// Parses the full text of one logical file into a sequence of lines.
/// `file` is used only to attach a [`SourcePos`] to any syntax error.
pub fn parse_source(file: &Path, source: &str) -> Result<Vec<SourceLine>, AssemblyError> {
    let pairs = SpectParser::parse(Rule::program, source).map_err(|e| {
        let line = match e.line_col {
            pest::error::LineColLocation::Pos((l, _)) => l,
            pest::error::LineColLocation::Span((l, _), _) => l,
        };
        AssemblyError::Syntax {
            pos: SourcePos::new(file, line),
            reason: e.variant.message().to_string(),
        }
    })?;

    let mut lines = Vec::new();
    for line_pair in pairs
        .flatten()
        .filter(|p| p.as_rule() == Rule::line_content)
    {
        let line_number = line_pair.as_span().start_pos().line_col().0;
        let mut line = SourceLine {
            line_number,
            ..Default::default()
        };

        for part in line_pair.into_inner() {
            match part.as_rule() {
                Rule::label => {
                    line.label = Some(part.into_inner().next().unwrap().as_str().to_string());
                }
                Rule::line_body => {
                    let inner = part.into_inner().next().unwrap();
                    match inner.as_rule() {
                        Rule::directive => line.directive = Some(build_directive(inner)),
                        Rule::constdef => line.directive = Some(build_constdef(inner)),
                        Rule::instruction => line.instruction = Some(build_instruction(inner)),
                        _ => unreachable!("unexpected line_body inner rule"),
                    }
                }
                _ => {}
            }
        }

        if line.label.is_some() || line.directive.is_some() || line.instruction.is_some() {
            lines.push(line);
        }
    }

    Ok(lines)
}

fn build_directive(pair: Pair<Rule>) -> Directive {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::ifdef_dir => Directive::IfDef(inner.into_inner().next().unwrap().as_str().to_string()),
        Rule::else_dir => Directive::Else,
        Rule::endif_dir => Directive::EndIf,
        Rule::define_dir => Directive::Define(inner.into_inner().next().unwrap().as_str().to_string()),
        Rule::include_dir => {
            let raw = inner.into_inner().next().unwrap().as_str();
            Directive::Include(raw.trim_matches('"').to_string())
        }
        _ => unreachable!("unexpected directive inner rule"),
    }
}

fn build_constdef(pair: Pair<Rule>) -> Directive {
    let mut inner = pair.into_inner();
    let ident = inner.next().unwrap().as_str().to_string();
    let value = build_value(inner.next().unwrap());
    Directive::ConstDef { ident, value }
}

fn build_instruction(pair: Pair<Rule>) -> RawInstruction {
    let mut inner = pair.into_inner();
    let mnemonic = inner.next().unwrap().as_str().to_uppercase();
    let operands = inner.map(build_operand).collect();
    RawInstruction { mnemonic, operands }
}

fn build_operand(pair: Pair<Rule>) -> Operand {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::register => {
            let digits = &inner.as_str()[1..];
            Operand::Register(digits.parse().expect("grammar guarantees digits"))
        }
        Rule::value => Operand::Value(build_value(inner)),
        Rule::identifier => Operand::Ident(inner.as_str().to_string()),
        _ => unreachable!("unexpected operand inner rule"),
    }
}

fn build_value(pair: Pair<Rule>) -> Value {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::hex_value => {
            let digits = &inner.as_str()[2..];
            Value::new(
                i64::from_str_radix(digits, 16).unwrap_or(0),
                digits.len() as u32 * 4,
            )
        }
        Rule::bin_value => {
            let digits = &inner.as_str()[2..];
            Value::new(i64::from_str_radix(digits, 2).unwrap_or(0), digits.len() as u32)
        }
        Rule::dec_value => {
            let digits = inner.as_str();
            let raw: i64 = digits.parse().unwrap_or(0);
            let bits_used = if raw == 0 {
                1
            } else {
                64 - (raw as u64).leading_zeros()
            };
            Value::new(raw, bits_used)
        }
        _ => unreachable!("unexpected value inner rule"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file() -> PathBuf {
        PathBuf::from("test.asm")
    }

    #[test]
    fn parses_bare_instruction() {
        let lines = parse_source(&file(), "NOP\n").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].instruction.as_ref().unwrap().mnemonic, "NOP");
    }

    #[test]
    fn parses_label_and_instruction_on_one_line() {
        let lines = parse_source(&file(), "loop: ADDI R1, 0x10\n").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].label.as_deref(), Some("loop"));
        let instr = lines[0].instruction.as_ref().unwrap();
        assert_eq!(instr.mnemonic, "ADDI");
        assert_eq!(instr.operands[0], Operand::Register(1));
        assert_eq!(instr.operands[1], Operand::Value(Value::new(0x10, 4)));
    }

    #[test]
    fn parses_constdef() {
        let lines = parse_source(&file(), "FOO.eq 0b101\n").unwrap();
        match lines[0].directive.as_ref().unwrap() {
            Directive::ConstDef { ident, value } => {
                assert_eq!(ident, "FOO");
                assert_eq!(value.raw, 0b101);
            }
            other => panic!("expected ConstDef, got {other:?}"),
        }
    }

    #[test]
    fn parses_ifdef_else_endif() {
        let lines = parse_source(&file(), ".ifdef DEBUG\n.else\n.endif\n").unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0].directive,
            Some(Directive::IfDef("DEBUG".to_string()))
        );
        assert_eq!(lines[1].directive, Some(Directive::Else));
        assert_eq!(lines[2].directive, Some(Directive::EndIf));
    }

    #[test]
    fn parses_include_strips_quotes() {
        let lines = parse_source(&file(), ".include \"other.asm\"\n").unwrap();
        assert_eq!(
            lines[0].directive,
            Some(Directive::Include("other.asm".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_source() {
        let err = parse_source(&file(), "ADDI R1, ,\n").unwrap_err();
        assert!(matches!(err, AssemblyError::Syntax { .. }));
    }

    #[test]
    fn ignores_comments_and_blank_lines() {
        let lines = parse_source(&file(), "; a comment\n\nNOP ; trailing\n").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].instruction.as_ref().unwrap().mnemonic, "NOP");
    }
}
