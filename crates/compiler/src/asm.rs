//! x86-64 assembly AST and AT&T text emission.
//!
//! Instructions carry [`Operand`]s that start life as `Pseudo` placeholders
//! for TAC variables; the codegen pipeline rewrites every one of them to a
//! `Stack` slot or `Data` symbol before emission, so rendering a `Pseudo`
//! is a hard bug. Output is `gcc`-ready AT&T syntax with a GNU-stack note
//! trailer and `.L`-prefixed local labels.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Ax,
    Cx,
    Dx,
    Di,
    Si,
    R8,
    R9,
    R10,
    R11,
}

impl Reg {
    pub fn name(self, width: u8) -> &'static str {
        match (self, width) {
            (Reg::Ax, 1) => "al",
            (Reg::Ax, 4) => "eax",
            (Reg::Ax, 8) => "rax",
            (Reg::Cx, 1) => "cl",
            (Reg::Cx, 4) => "ecx",
            (Reg::Cx, 8) => "rcx",
            (Reg::Dx, 1) => "dl",
            (Reg::Dx, 4) => "edx",
            (Reg::Dx, 8) => "rdx",
            (Reg::Di, 1) => "dil",
            (Reg::Di, 4) => "edi",
            (Reg::Di, 8) => "rdi",
            (Reg::Si, 1) => "sil",
            (Reg::Si, 4) => "esi",
            (Reg::Si, 8) => "rsi",
            (Reg::R8, 1) => "r8b",
            (Reg::R8, 4) => "r8d",
            (Reg::R8, 8) => "r8",
            (Reg::R9, 1) => "r9b",
            (Reg::R9, 4) => "r9d",
            (Reg::R9, 8) => "r9",
            (Reg::R10, 1) => "r10b",
            (Reg::R10, 4) => "r10d",
            (Reg::R10, 8) => "r10",
            (Reg::R11, 1) => "r11b",
            (Reg::R11, 4) => "r11d",
            (Reg::R11, 8) => "r11",
            (reg, width) => unreachable!("register {:?} has no {}-byte name", reg, width),
        }
    }
}

/// Condition codes as used by `j<cc>` and `set<cc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondCode {
    E,
    Ne,
    L,
    Le,
    G,
    Ge,
}

impl CondCode {
    pub fn suffix(self) -> &'static str {
        match self {
            CondCode::E => "e",
            CondCode::Ne => "ne",
            CondCode::L => "l",
            CondCode::Le => "le",
            CondCode::G => "g",
            CondCode::Ge => "ge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Imm(i32),
    Reg(Reg, u8),
    /// Placeholder for a TAC variable; replaced before emission.
    Pseudo(String),
    /// `<offset>(%rbp)`
    Stack(i32),
    /// `<name>(%rip)`
    Data(String),
    /// Result slot of a value-less TAC statement; never rendered.
    Null,
}

impl Operand {
    pub fn is_memory(&self) -> bool {
        matches!(self, Operand::Stack(_) | Operand::Data(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(value) => write!(f, "${}", value),
            Operand::Reg(reg, width) => write!(f, "%{}", reg.name(*width)),
            Operand::Stack(offset) => write!(f, "{}(%rbp)", offset),
            Operand::Data(name) => write!(f, "{}(%rip)", name),
            Operand::Null => Ok(()),
            Operand::Pseudo(name) => {
                unreachable!("pseudo operand {} survived to emission", name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOp::Neg => "negl",
            UnaryOp::Not => "notl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Imul,
    Sal,
    Sar,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "addl",
            BinaryOp::Sub => "subl",
            BinaryOp::Imul => "imull",
            BinaryOp::Sal => "sall",
            BinaryOp::Sar => "sarl",
            BinaryOp::And => "andl",
            BinaryOp::Or => "orl",
            BinaryOp::Xor => "xorl",
        }
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Sal | BinaryOp::Sar)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Mov { src: Operand, dst: Operand },
    Unary { op: UnaryOp, dst: Operand },
    Binary { op: BinaryOp, src: Operand, dst: Operand },
    Cmp { left: Operand, right: Operand },
    Idiv(Operand),
    Cdq,
    Jmp(String),
    JmpCC { cond: CondCode, target: String },
    SetCC { cond: CondCode, dst: Operand },
    Label(String),
    /// Negative size: how far `%rsp` moves down at function entry.
    AllocateStack(i32),
    DeallocateStack(i32),
    Push(Operand),
    Call(String),
    Ret,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Mov { src, dst } => {
                write!(f, "    {:<6}    {:<6}, {}", "movl", src.to_string(), dst)
            }
            Instruction::Unary { op, dst } => {
                write!(f, "    {:<6}    {}", op.mnemonic(), dst)
            }
            Instruction::Binary { op, src, dst } => {
                write!(f, "    {:<6}    {:<6}, {}", op.mnemonic(), src.to_string(), dst)
            }
            Instruction::Cmp { left, right } => {
                write!(f, "    {:<6}    {:<6}, {}", "cmpl", left.to_string(), right)
            }
            Instruction::Idiv(divisor) => write!(f, "    {:<6}    {}", "idivl", divisor),
            Instruction::Cdq => write!(f, "    cdq"),
            Instruction::Jmp(target) => write!(f, "    {:<6}    .L{}", "jmp", target),
            Instruction::JmpCC { cond, target } => {
                write!(f, "    {:<6}    .L{}", format!("j{}", cond.suffix()), target)
            }
            Instruction::SetCC { cond, dst } => {
                write!(f, "    {:<6}    {}", format!("set{}", cond.suffix()), dst)
            }
            Instruction::Label(label) => write!(f, ".L{}:", label),
            Instruction::AllocateStack(size) => {
                write!(f, "    {:<6}    ${}, %rsp", "subq", -size)
            }
            Instruction::DeallocateStack(size) => {
                write!(f, "    {:<6}    ${}, %rsp", "addq", size)
            }
            Instruction::Push(operand) => write!(f, "    {:<6}    {}", "pushq", operand),
            Instruction::Call(name) => write!(f, "    {:<6}    {}", "call", name),
            Instruction::Ret => write!(
                f,
                "    movq      %rbp, %rsp\n    popq      %rbp\n    ret"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopLevel {
    Function {
        name: String,
        global: bool,
        instructions: Vec<Instruction>,
        /// Most negative slot offset; set by pseudo replacement, consumed
        /// by the fix-up pass.
        stack_size: Option<i32>,
    },
    StaticVar {
        name: String,
        global: bool,
        init: i32,
    },
}

impl fmt::Display for TopLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopLevel::Function {
                name,
                global,
                instructions,
                ..
            } => {
                if *global {
                    writeln!(f, "    .globl {}", name)?;
                }
                writeln!(f, "    .text")?;
                writeln!(f, "{}:", name)?;
                writeln!(f, "    pushq     %rbp")?;
                writeln!(f, "    movq      %rsp, %rbp")?;
                for instruction in instructions {
                    writeln!(f, "{}", instruction)?;
                }
                Ok(())
            }
            TopLevel::StaticVar { name, global, init } => {
                if *global {
                    writeln!(f, "    .globl {}", name)?;
                }
                if *init == 0 {
                    writeln!(f, "    .bss")?;
                } else {
                    writeln!(f, "    .data")?;
                }
                writeln!(f, "    .align 4")?;
                writeln!(f, "{}:", name)?;
                if *init == 0 {
                    writeln!(f, "    .zero 4")
                } else {
                    writeln!(f, "    .long {}", init)
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub top_level: Vec<TopLevel>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for top_level in &self.top_level {
            writeln!(f, "{}", top_level)?;
        }
        writeln!(f, "    .section .note.GNU-stack,\"\",@progbits")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_rendering() {
        assert_eq!(Operand::Imm(5).to_string(), "$5");
        assert_eq!(Operand::Reg(Reg::Ax, 4).to_string(), "%eax");
        assert_eq!(Operand::Reg(Reg::R10, 8).to_string(), "%r10");
        assert_eq!(Operand::Stack(-4).to_string(), "-4(%rbp)");
        assert_eq!(Operand::Data("n".into()).to_string(), "n(%rip)");
    }

    #[test]
    #[should_panic(expected = "pseudo operand")]
    fn test_pseudo_operand_never_renders() {
        let _ = Operand::Pseudo(".tmpvar.1".into()).to_string();
    }

    #[test]
    fn test_mov_line_format() {
        let mov = Instruction::Mov {
            src: Operand::Imm(2),
            dst: Operand::Stack(-4),
        };
        assert_eq!(mov.to_string(), "    movl      $2    , -4(%rbp)");
    }

    #[test]
    fn test_jump_and_label_use_local_prefix() {
        assert_eq!(
            Instruction::Jmp("x".into()).to_string(),
            "    jmp       .Lx"
        );
        assert_eq!(
            Instruction::JmpCC {
                cond: CondCode::Ne,
                target: "x".into()
            }
            .to_string(),
            "    jne       .Lx"
        );
        assert_eq!(Instruction::Label("x".into()).to_string(), ".Lx:");
    }

    #[test]
    fn test_allocate_stack_renders_positive_subtraction() {
        assert_eq!(
            Instruction::AllocateStack(-16).to_string(),
            "    subq      $16, %rsp"
        );
        assert_eq!(
            Instruction::DeallocateStack(24).to_string(),
            "    addq      $24, %rsp"
        );
    }

    #[test]
    fn test_ret_embeds_epilogue() {
        let text = Instruction::Ret.to_string();
        assert!(text.contains("movq"));
        assert!(text.contains("popq"));
        assert!(text.ends_with("ret"));
    }

    #[test]
    fn test_function_header_and_prologue() {
        let func = TopLevel::Function {
            name: "main".into(),
            global: true,
            instructions: vec![Instruction::Ret],
            stack_size: Some(0),
        };
        let text = func.to_string();
        assert!(text.starts_with("    .globl main\n    .text\nmain:\n"));
        assert!(text.contains("pushq     %rbp"));
        assert!(text.contains("movq      %rsp, %rbp"));
    }

    #[test]
    fn test_static_var_sections() {
        let zero = TopLevel::StaticVar {
            name: "n".into(),
            global: false,
            init: 0,
        };
        let text = zero.to_string();
        assert!(text.contains(".bss"));
        assert!(text.contains(".zero 4"));
        assert!(!text.contains(".globl"));

        let nonzero = TopLevel::StaticVar {
            name: "m".into(),
            global: true,
            init: 9,
        };
        let text = nonzero.to_string();
        assert!(text.contains(".globl m"));
        assert!(text.contains(".data"));
        assert!(text.contains(".long 9"));
    }

    #[test]
    fn test_program_trailer() {
        let program = Program { top_level: vec![] };
        assert!(program
            .to_string()
            .ends_with(".section .note.GNU-stack,\"\",@progbits\n"));
    }
}
