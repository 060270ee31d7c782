//! Directive dispatcher: phase state machine, per-directive parsing, and
//! routing to handlers (spec §4.I).

pub mod handlers;
pub mod statements;

use crate::attribute_stack::AttributeStack;
use crate::error::{PbrtError, PbrtResult};
use crate::matrix::Matrix4;
use crate::param_table::{Interner, ParamTable, ParamType, ParamValue};
use crate::scene::Scene;
use crate::spectral;
use crate::tokenizer::{Token, Tokenizer};
use crate::transform_stack::TransformStack;
use statements::{find_statement, ArgKind, StatementTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preamble,
    World,
}

/// Forward-reference handling for named materials/mediums/textures (spec §9
/// open question, resolved in SPEC_FULL.md §4.I: fail-fast is the only
/// implemented policy; `Buffered` is a documented future option).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardRefPolicy {
    FailFast,
}

/// One-token lookahead over the tokenizer, needed because parameter lists
/// are terminated by "the next token isn't a `\"type name\"` string" (spec
/// §4.I "Per-directive flow").
struct Lookahead {
    tz: Tokenizer,
    pending: Option<Token>,
}

impl Lookahead {
    fn new(tz: Tokenizer) -> Self {
        Lookahead { tz, pending: None }
    }

    fn peek(&mut self) -> PbrtResult<Token> {
        if self.pending.is_none() {
            self.pending = Some(self.next_raw()?);
        }
        Ok(self.pending.clone().unwrap())
    }

    fn bump(&mut self) -> PbrtResult<Token> {
        if let Some(t) = self.pending.take() {
            return Ok(t);
        }
        self.next_raw()
    }

    /// Fetch the next token, transparently popping finished include files
    /// (spec §4.D "when a file ends and report_eof is false, pop
    /// automatically").
    fn next_raw(&mut self) -> PbrtResult<Token> {
        loop {
            let tok = self.tz.next_token()?;
            if tok == Token::Eof && self.tz.buffer.include_depth() > 0 && !self.tz.buffer.current_reports_eof() {
                log::debug!("popping include file at depth {}", self.tz.buffer.include_depth());
                self.tz.buffer.pop_file()?;
                continue;
            }
            return Ok(tok);
        }
    }

    fn current_filename(&self) -> String {
        self.tz.buffer.current_filename().display().to_string()
    }

    fn offset(&self) -> u64 {
        self.tz.buffer.absolute_offset()
    }
}

pub struct Dispatcher {
    lookahead: Lookahead,
    pub transform: TransformStack,
    pub attributes: AttributeStack,
    pub scene: Scene,
    params: ParamTable,
    pub interner: Interner,
    phase: Phase,
    active_object: Option<usize>,
    forward_ref_policy: ForwardRefPolicy,
    named_mediums: std::collections::HashMap<String, u32>,
}

impl Dispatcher {
    pub fn new(tz: Tokenizer) -> Self {
        Dispatcher {
            lookahead: Lookahead::new(tz),
            transform: TransformStack::new(),
            attributes: AttributeStack::new(),
            scene: Scene::new(),
            params: ParamTable::new(),
            interner: Interner::new(),
            phase: Phase::Preamble,
            active_object: None,
            forward_ref_policy: ForwardRefPolicy::FailFast,
            named_mediums: std::collections::HashMap::new(),
        }
    }

    pub fn register_named_medium(&mut self, name: String, index: u32) {
        self.named_mediums.insert(name, index);
    }

    pub fn lookup_named_medium(&self, name: &str) -> Option<u32> {
        self.named_mediums.get(name).copied()
    }

    /// `Include` handler: push a new file onto the tokenizer's buffer stack.
    /// Ordinary includes auto-pop at EOF (spec §4.D); only Samples-parameter
    /// SPD files set `report_eof`.
    pub fn push_include(&mut self, name: &str) -> PbrtResult<()> {
        self.lookahead.tz.buffer.push_file(name, false)
    }

    fn err_syntactic(&self, message: impl Into<String>) -> PbrtError {
        PbrtError::syntactic(self.lookahead.current_filename(), self.lookahead.offset(), message)
    }

    fn err_semantic(&self, message: impl Into<String>) -> PbrtError {
        PbrtError::semantic(self.lookahead.current_filename(), self.lookahead.offset(), message)
    }

    /// Drive the dispatcher until EOF or the first error.
    pub fn run(&mut self) -> PbrtResult<()> {
        spectral::SpectralTables::get(); // one-shot init before any spectrum conversion (spec §5, §9)
        loop {
            let tok = self.lookahead.bump()?;
            match tok {
                Token::Eof => return Ok(()),
                Token::Identifier(word) => self.dispatch(&word)?,
                other => return Err(self.err_syntactic(format!("expected a directive keyword, found {other:?}"))),
            }
        }
    }

    fn dispatch(&mut self, word: &str) -> PbrtResult<()> {
        let Some(stmt) = find_statement(word) else {
            return Err(self.err_syntactic(format!("unknown directive \"{word}\"")));
        };
        let allowed = match self.phase {
            Phase::Preamble => stmt.preamble_allowed,
            Phase::World => stmt.world_allowed,
        };
        if !allowed {
            return Err(self.err_syntactic(format!("directive \"{word}\" not allowed in current phase")));
        }

        log::trace!("dispatching {word}");
        let args = self.parse_positional_args(stmt.args)?;
        self.params.clear();
        self.parse_params()?;

        handlers::handle(self, stmt.tag, &args)
    }

    fn parse_positional_args(&mut self, pattern: &[ArgKind]) -> PbrtResult<Vec<PositionalArg>> {
        if pattern.is_empty() {
            return Ok(Vec::new());
        }
        let bracketed = matches!(self.lookahead.peek()?, Token::LBracket);
        if bracketed {
            self.lookahead.bump()?;
        }
        let mut out = Vec::with_capacity(pattern.len());
        for kind in pattern {
            out.push(self.parse_one_arg(*kind)?);
        }
        if bracketed {
            match self.lookahead.bump()? {
                Token::RBracket => {}
                other => return Err(self.err_syntactic(format!("expected closing ']', found {other:?}"))),
            }
        }
        Ok(out)
    }

    fn parse_one_arg(&mut self, kind: ArgKind) -> PbrtResult<PositionalArg> {
        match kind {
            ArgKind::Float => match self.lookahead.bump()? {
                Token::Number(n) => Ok(PositionalArg::Float(n)),
                other => Err(self.err_syntactic(format!("expected a number, found {other:?}"))),
            },
            ArgKind::Str | ArgKind::QuotedEnum => match self.lookahead.bump()? {
                Token::Str(s) => Ok(PositionalArg::Str(s)),
                other => Err(self.err_syntactic(format!("expected a quoted string, found {other:?}"))),
            },
            ArgKind::BareKeyword => match self.lookahead.bump()? {
                Token::Identifier(s) => Ok(PositionalArg::Str(s)),
                other => Err(self.err_syntactic(format!("expected a bare keyword, found {other:?}"))),
            },
        }
    }

    /// Consume named parameters until the next token isn't an opening
    /// `"type name"` string (spec §4.I).
    fn parse_params(&mut self) -> PbrtResult<()> {
        loop {
            let Token::Str(decl) = self.lookahead.peek()? else { break };
            let mut parts = decl.splitn(2, ' ');
            let Some(ty_kw) = parts.next() else { break };
            let Some(ty) = ParamType::from_keyword(ty_kw) else { break };
            let name = parts.next().unwrap_or("").to_string();
            if name.is_empty() {
                break;
            }
            self.lookahead.bump()?; // consume the "type name" string
            let value = self.parse_param_value(ty)?;
            // Parameter names recur constantly across a file ("Kd", "roughness",
            // ...); intern them so repeats share one allocation (spec §9).
            self.interner.intern(&name);
            self.params.push(name, ty, value);
        }
        Ok(())
    }

    fn parse_param_value(&mut self, ty: ParamType) -> PbrtResult<ParamValue> {
        match ty {
            ParamType::Bool => {
                let strs = self.collect_strings()?;
                Ok(ParamValue::Bool(strs.iter().map(|s| s == "true").collect()))
            }
            ParamType::Int => {
                let nums = self.collect_numbers()?;
                Ok(ParamValue::Int(nums.into_iter().map(|n| n as i32).collect()))
            }
            ParamType::Float => Ok(ParamValue::Float(self.collect_numbers()?)),
            ParamType::Point2 | ParamType::Vector2 => {
                let nums = self.collect_numbers()?;
                Ok(group2(&nums, ty))
            }
            ParamType::Point3 | ParamType::Vector3 | ParamType::Normal3 | ParamType::Rgb | ParamType::Xyz => {
                let nums = self.collect_numbers()?;
                Ok(group3(&nums, ty))
            }
            ParamType::Blackbody => {
                let nums = self.collect_numbers()?;
                if nums.len() != 2 {
                    return Err(self.err_semantic("blackbody parameter requires exactly 2 values (temperature, scale)"));
                }
                Ok(ParamValue::Blackbody(vec![[nums[0], nums[1]]]))
            }
            ParamType::Samples => self.parse_samples_value(),
            ParamType::String => Ok(ParamValue::String(self.collect_strings()?)),
            ParamType::Texture => {
                let strs = self.collect_strings()?;
                let name = strs.into_iter().next().ok_or_else(|| self.err_semantic("texture parameter requires a name"))?;
                Ok(ParamValue::Texture(name))
            }
        }
    }

    fn parse_samples_value(&mut self) -> PbrtResult<ParamValue> {
        if let Token::Str(filename) = self.lookahead.peek()? {
            let filename = filename.clone();
            self.lookahead.bump()?;
            log::debug!("opening spectrum sample file {filename}");
            self.lookahead.tz.buffer.push_file(&filename, true)?;
            let mut pairs = Vec::new();
            loop {
                let tok = self.lookahead.tz.next_token()?;
                match tok {
                    Token::Number(wavelength) => {
                        let value = match self.lookahead.tz.next_token()? {
                            Token::Number(v) => v,
                            other => return Err(self.err_syntactic(format!("expected a value after wavelength, found {other:?}"))),
                        };
                        pairs.push((wavelength, value));
                    }
                    Token::Eof => break,
                    other => return Err(self.err_syntactic(format!("unexpected token in spectrum file: {other:?}"))),
                }
            }
            self.lookahead.tz.buffer.pop_file()?;
            return Ok(ParamValue::Samples(pairs));
        }

        let nums = self.collect_numbers()?;
        if nums.len() % 2 != 0 {
            return Err(self.err_semantic("spectrum parameter requires an even number of wavelength/value floats"));
        }
        let pairs = nums.chunks(2).map(|c| (c[0], c[1])).collect();
        Ok(ParamValue::Samples(pairs))
    }

    fn collect_numbers(&mut self) -> PbrtResult<Vec<f64>> {
        if matches!(self.lookahead.peek()?, Token::LBracket) {
            self.lookahead.bump()?;
            let mut out = Vec::new();
            loop {
                match self.lookahead.peek()? {
                    Token::RBracket => {
                        self.lookahead.bump()?;
                        break;
                    }
                    Token::Number(_) => {
                        if let Token::Number(n) = self.lookahead.bump()? {
                            out.push(n);
                        }
                    }
                    other => return Err(self.err_syntactic(format!("expected a number or ']', found {other:?}"))),
                }
            }
            Ok(out)
        } else {
            match self.lookahead.bump()? {
                Token::Number(n) => Ok(vec![n]),
                other => Err(self.err_syntactic(format!("expected a number, found {other:?}"))),
            }
        }
    }

    fn collect_strings(&mut self) -> PbrtResult<Vec<String>> {
        if matches!(self.lookahead.peek()?, Token::LBracket) {
            self.lookahead.bump()?;
            let mut out = Vec::new();
            loop {
                match self.lookahead.peek()? {
                    Token::RBracket => {
                        self.lookahead.bump()?;
                        break;
                    }
                    Token::Str(_) => {
                        if let Token::Str(s) = self.lookahead.bump()? {
                            out.push(s);
                        }
                    }
                    other => return Err(self.err_syntactic(format!("expected a string or ']', found {other:?}"))),
                }
            }
            Ok(out)
        } else {
            match self.lookahead.bump()? {
                Token::Str(s) => Ok(vec![s]),
                other => Err(self.err_syntactic(format!("expected a string, found {other:?}"))),
            }
        }
    }

    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn enter_world(&mut self) {
        log::debug!("entering world phase: clearing transform/attribute stacks, seeding defaults");
        self.transform.clear();
        self.attributes.clear();
        handlers::seed_rendering_defaults(self);
        self.phase = Phase::World;
    }

    pub fn leave_world(&mut self) {
        self.phase = Phase::Preamble;
    }

    pub fn active_object(&self) -> Option<usize> {
        self.active_object
    }

    pub fn set_active_object(&mut self, idx: Option<usize>) {
        self.active_object = idx;
    }

    pub fn forward_ref_policy(&self) -> ForwardRefPolicy {
        self.forward_ref_policy
    }

    pub fn error_at(&self, message: impl Into<String>) -> PbrtError {
        self.err_semantic(message)
    }

    pub fn syntactic_error_at(&self, message: impl Into<String>) -> PbrtError {
        self.err_syntactic(message)
    }

    pub fn current_filename(&self) -> String {
        self.lookahead.current_filename()
    }

    pub fn current_offset(&self) -> u64 {
        self.lookahead.offset()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionalArg {
    Float(f64),
    Str(String),
}

impl PositionalArg {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PositionalArg::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PositionalArg::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

fn group2(nums: &[f64], ty: ParamType) -> ParamValue {
    let pairs: Vec<[f64; 2]> = nums.chunks(2).map(|c| [c[0], c.get(1).copied().unwrap_or(0.0)]).collect();
    match ty {
        ParamType::Point2 => ParamValue::Point2(pairs),
        _ => ParamValue::Vector2(pairs),
    }
}

fn group3(nums: &[f64], ty: ParamType) -> ParamValue {
    let triples: Vec<[f64; 3]> = nums
        .chunks(3)
        .map(|c| [c[0], c.get(1).copied().unwrap_or(0.0), c.get(2).copied().unwrap_or(0.0)])
        .collect();
    match ty {
        ParamType::Point3 => ParamValue::Point3(triples),
        ParamType::Vector3 => ParamValue::Vector3(triples),
        ParamType::Normal3 => ParamValue::Normal3(triples),
        ParamType::Rgb => ParamValue::Rgb(triples),
        _ => ParamValue::Xyz(triples),
    }
}

/// Helper shared with handlers: apply the spec §4.C column-major transpose
/// required for `Transform`/`ConcatTransform`'s 16 input floats.
pub fn matrix_from_column_major(values: &[f64]) -> Matrix4 {
    let mut row_major = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            row_major[row * 4 + col] = values[col * 4 + row];
        }
    }
    Matrix4::from_row_major(&row_major)
}
