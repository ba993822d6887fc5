use std::fmt::{self, Write as _};

use log::trace;

const DEFAULT_CODE_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label(Box<str>);

impl Label {
    pub fn named(name: &str) -> Label {
        Label(name.into())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One VM instruction, or a label marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    Label(Label),

    PushI(i64),
    PushS(Box<str>),
    PushFp,
    PushA(Label),
    PushL(isize),
    PushG(usize),
    StoreL(isize),
    StoreG(usize),
    Load(isize),
    Pop(usize),

    Jump(Label),
    Jz(Label),
    Call,
    Return,
    Start,
    Stop,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    Sup,
    SupEq,
    Inf,
    InfEq,

    AllocN,
    LoadN,
    StoreN,
    CharAt,
    StrLen,

    Read,
    Atoi,
    WriteI,
    WriteS,
    WriteChr,
    WriteLn,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instr::*;
        match self {
            Label(label) => write!(f, "{label}:"),

            PushI(n) => write!(f, "PUSHI {n}"),
            PushS(s) => {
                f.write_str("PUSHS \"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        c => f.write_char(c)?,
                    }
                }
                f.write_str("\"")
            }
            PushFp => f.write_str("PUSHFP"),
            PushA(label) => write!(f, "PUSHA {label}"),
            PushL(n) => write!(f, "PUSHL {n}"),
            PushG(n) => write!(f, "PUSHG {n}"),
            StoreL(n) => write!(f, "STOREL {n}"),
            StoreG(n) => write!(f, "STOREG {n}"),
            Load(n) => write!(f, "LOAD {n}"),
            Pop(n) => write!(f, "POP {n}"),

            Jump(label) => write!(f, "JUMP {label}"),
            Jz(label) => write!(f, "JZ {label}"),
            Call => f.write_str("CALL"),
            Return => f.write_str("RETURN"),
            Start => f.write_str("START"),
            Stop => f.write_str("STOP"),

            Add => f.write_str("ADD"),
            Sub => f.write_str("SUB"),
            Mul => f.write_str("MUL"),
            Div => f.write_str("DIV"),
            Mod => f.write_str("MOD"),
            Equal => f.write_str("EQUAL"),
            Sup => f.write_str("SUP"),
            SupEq => f.write_str("SUPEQ"),
            Inf => f.write_str("INF"),
            InfEq => f.write_str("INFEQ"),

            AllocN => f.write_str("ALLOCN"),
            LoadN => f.write_str("LOADN"),
            StoreN => f.write_str("STOREN"),
            CharAt => f.write_str("CHARAT"),
            StrLen => f.write_str("STRLEN"),

            Read => f.write_str("READ"),
            Atoi => f.write_str("ATOI"),
            WriteI => f.write_str("WRITEI"),
            WriteS => f.write_str("WRITES"),
            WriteChr => f.write_str("WRITECHR"),
            WriteLn => f.write_str("WRITELN"),
        }
    }
}

/// Append-only instruction buffer and label allocator.
pub struct Emitter {
    code: Vec<Instr>,
    next_label: usize,
}

impl Default for Emitter {
    fn default() -> Self {
        Emitter::new()
    }
}

impl Emitter {
    pub fn new() -> Emitter {
        Emitter {
            code: Vec::with_capacity(DEFAULT_CODE_CAPACITY),
            next_label: 0,
        }
    }

    pub fn emit(&mut self, instr: Instr) {
        self.code.push(instr);
    }

    pub fn label(&mut self, label: Label) {
        self.emit(Instr::Label(label));
    }

    /// Allocates a fresh label. Labels are never reused within an emitter.
    pub fn new_label(&mut self) -> Label {
        let label = Label(format!("L{}", self.next_label).into());
        self.next_label += 1;
        trace!("allocated label {label}");
        label
    }

    /// Renders one instruction per line, with a trailing newline.
    pub fn finish(self) -> String {
        let mut out = String::with_capacity(self.code.len() * 8);
        for instr in &self.code {
            writeln!(out, "{instr}").expect("writing to a string is infallible");
        }
        out
    }
}
