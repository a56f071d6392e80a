//! Code generation: TAC to assembly in three passes.
//!
//! 1. Instruction selection: each TAC instruction expands to a fixed
//!    x86-64 pattern with `Pseudo` operands standing in for variables.
//! 2. Pseudo replacement: every `Pseudo` becomes a `Stack` slot (automatic
//!    storage, 4 bytes per slot) or a `Data` reference (static storage, per
//!    the symbol table).
//! 3. Fix-up: rewrites operand combinations x86 does not accept (two
//!    memory operands, memory multiply destinations, immediate divisors,
//!    non-CL shift counts) using the scratch registers `R10`/`R11`, and
//!    plants the frame allocation, rounded so `%rsp` stays 16-byte aligned
//!    at every call site.

use crate::asm::{self, CondCode, Instruction, Operand, Reg};
use crate::tac;
use crate::typechecker::SymbolTable;
use std::collections::HashMap;

/// System V integer argument registers, in order.
const ARG_REGISTERS: [Reg; 6] = [Reg::Di, Reg::Si, Reg::Dx, Reg::Cx, Reg::R8, Reg::R9];

pub fn gen_program(program: &tac::Program) -> asm::Program {
    let top_level = program
        .top_level
        .iter()
        .map(|top_level| match top_level {
            tac::TopLevel::Function {
                name,
                global,
                params,
                body,
            } => gen_function(name, *global, params, body),
            tac::TopLevel::StaticVar { name, global, init } => asm::TopLevel::StaticVar {
                name: name.clone(),
                global: *global,
                init: *init,
            },
        })
        .collect();
    asm::Program { top_level }
}

fn operand(value: &tac::Value) -> Operand {
    match value {
        tac::Value::Constant(v) => Operand::Imm(*v),
        tac::Value::Variable(name) => Operand::Pseudo(name.clone()),
        tac::Value::Null => Operand::Null,
    }
}

fn gen_function(
    name: &str,
    global: bool,
    params: &[String],
    body: &[tac::Instruction],
) -> asm::TopLevel {
    let mut instructions = Vec::new();

    // First six parameters arrive in registers; the rest sit above the
    // return address in the caller's frame, starting at 16(%rbp).
    for (idx, param) in params.iter().take(ARG_REGISTERS.len()).enumerate() {
        instructions.push(Instruction::Mov {
            src: Operand::Reg(ARG_REGISTERS[idx], 4),
            dst: Operand::Pseudo(param.clone()),
        });
    }
    for (idx, param) in params.iter().skip(ARG_REGISTERS.len()).enumerate() {
        instructions.push(Instruction::Mov {
            src: Operand::Stack(((idx + 2) * 8) as i32),
            dst: Operand::Pseudo(param.clone()),
        });
    }

    for instruction in body {
        gen_instruction(instruction, &mut instructions);
    }

    asm::TopLevel::Function {
        name: name.to_string(),
        global,
        instructions,
        stack_size: None,
    }
}

fn arithmetic_op(op: tac::BinaryOp) -> Option<asm::BinaryOp> {
    match op {
        tac::BinaryOp::Add => Some(asm::BinaryOp::Add),
        tac::BinaryOp::Subtract => Some(asm::BinaryOp::Sub),
        tac::BinaryOp::Multiply => Some(asm::BinaryOp::Imul),
        tac::BinaryOp::LeftShift => Some(asm::BinaryOp::Sal),
        tac::BinaryOp::RightShift => Some(asm::BinaryOp::Sar),
        tac::BinaryOp::BitwiseAnd => Some(asm::BinaryOp::And),
        tac::BinaryOp::BitwiseOr => Some(asm::BinaryOp::Or),
        tac::BinaryOp::BitwiseXor => Some(asm::BinaryOp::Xor),
        _ => None,
    }
}

fn cond_code(op: tac::BinaryOp) -> Option<CondCode> {
    match op {
        tac::BinaryOp::Equal => Some(CondCode::E),
        tac::BinaryOp::NotEqual => Some(CondCode::Ne),
        tac::BinaryOp::LessThan => Some(CondCode::L),
        tac::BinaryOp::LessOrEqual => Some(CondCode::Le),
        tac::BinaryOp::GreaterThan => Some(CondCode::G),
        tac::BinaryOp::GreaterOrEqual => Some(CondCode::Ge),
        _ => None,
    }
}

fn gen_instruction(instruction: &tac::Instruction, out: &mut Vec<Instruction>) {
    match instruction {
        tac::Instruction::Return(value) => {
            out.push(Instruction::Mov {
                src: operand(value),
                dst: Operand::Reg(Reg::Ax, 4),
            });
            out.push(Instruction::Ret);
        }
        tac::Instruction::Unary { op, src, dst } => gen_unary(*op, src, dst, out),
        tac::Instruction::Binary {
            op,
            left,
            right,
            dst,
        } => gen_binary(*op, left, right, dst, out),
        tac::Instruction::Copy { src, dst } => out.push(Instruction::Mov {
            src: operand(src),
            dst: operand(dst),
        }),
        tac::Instruction::Jump(target) => out.push(Instruction::Jmp(target.clone())),
        tac::Instruction::JumpIfZero { cond, target } => {
            out.push(Instruction::Cmp {
                left: Operand::Imm(0),
                right: operand(cond),
            });
            out.push(Instruction::JmpCC {
                cond: CondCode::E,
                target: target.clone(),
            });
        }
        tac::Instruction::JumpIfNotZero { cond, target } => {
            out.push(Instruction::Cmp {
                left: Operand::Imm(0),
                right: operand(cond),
            });
            out.push(Instruction::JmpCC {
                cond: CondCode::Ne,
                target: target.clone(),
            });
        }
        tac::Instruction::Label(label) => out.push(Instruction::Label(label.clone())),
        tac::Instruction::FuncCall { name, args, dst } => gen_call(name, args, dst, out),
    }
}

fn gen_unary(op: tac::UnaryOp, src: &tac::Value, dst: &tac::Value, out: &mut Vec<Instruction>) {
    let src = operand(src);
    let dst = operand(dst);
    match op {
        tac::UnaryOp::Complement => {
            out.push(Instruction::Mov {
                src,
                dst: dst.clone(),
            });
            out.push(Instruction::Unary {
                op: asm::UnaryOp::Not,
                dst,
            });
        }
        tac::UnaryOp::Negate => {
            out.push(Instruction::Mov {
                src,
                dst: dst.clone(),
            });
            out.push(Instruction::Unary {
                op: asm::UnaryOp::Neg,
                dst,
            });
        }
        tac::UnaryOp::Not => {
            out.push(Instruction::Cmp {
                left: Operand::Imm(0),
                right: src,
            });
            out.push(Instruction::Mov {
                src: Operand::Imm(0),
                dst: dst.clone(),
            });
            out.push(Instruction::SetCC {
                cond: CondCode::E,
                dst,
            });
        }
        tac::UnaryOp::PrefixIncrement | tac::UnaryOp::PrefixDecrement => {
            let op = if op == tac::UnaryOp::PrefixIncrement {
                asm::BinaryOp::Add
            } else {
                asm::BinaryOp::Sub
            };
            out.push(Instruction::Binary {
                op,
                src: Operand::Imm(1),
                dst: src.clone(),
            });
            out.push(Instruction::Mov { src, dst });
        }
        tac::UnaryOp::PostfixIncrement | tac::UnaryOp::PostfixDecrement => {
            let op = if op == tac::UnaryOp::PostfixIncrement {
                asm::BinaryOp::Add
            } else {
                asm::BinaryOp::Sub
            };
            out.push(Instruction::Mov {
                src: src.clone(),
                dst,
            });
            out.push(Instruction::Binary {
                op,
                src: Operand::Imm(1),
                dst: src,
            });
        }
    }
}

fn gen_binary(
    op: tac::BinaryOp,
    left: &tac::Value,
    right: &tac::Value,
    dst: &tac::Value,
    out: &mut Vec<Instruction>,
) {
    let left = operand(left);
    let right = operand(right);
    let dst = operand(dst);

    if let Some(op) = arithmetic_op(op) {
        out.push(Instruction::Mov {
            src: left,
            dst: dst.clone(),
        });
        out.push(Instruction::Binary {
            op,
            src: right,
            dst,
        });
    } else if let Some(cond) = cond_code(op) {
        out.push(Instruction::Cmp { left: right, right: left });
        out.push(Instruction::Mov {
            src: Operand::Imm(0),
            dst: dst.clone(),
        });
        out.push(Instruction::SetCC { cond, dst });
    } else {
        // Division family: dividend in EAX, sign-extended into EDX:EAX;
        // quotient lands in EAX, remainder in EDX.
        let result = if op == tac::BinaryOp::Divide {
            Reg::Ax
        } else {
            Reg::Dx
        };
        out.push(Instruction::Mov {
            src: left,
            dst: Operand::Reg(Reg::Ax, 4),
        });
        out.push(Instruction::Cdq);
        out.push(Instruction::Idiv(right));
        out.push(Instruction::Mov {
            src: Operand::Reg(result, 4),
            dst,
        });
    }
}

fn gen_call(name: &str, args: &[tac::Value], dst: &tac::Value, out: &mut Vec<Instruction>) {
    let split = args.len().min(ARG_REGISTERS.len());
    let (register_args, stack_args) = args.split_at(split);

    // Each stack argument is an 8-byte push; an odd count would leave %rsp
    // misaligned at the call.
    let stack_padding: i32 = if stack_args.len() % 2 == 0 { 0 } else { 8 };
    if stack_padding != 0 {
        out.push(Instruction::AllocateStack(-stack_padding));
    }

    for (idx, arg) in register_args.iter().enumerate() {
        out.push(Instruction::Mov {
            src: operand(arg),
            dst: Operand::Reg(ARG_REGISTERS[idx], 4),
        });
    }

    for arg in stack_args.iter().rev() {
        let arg = operand(arg);
        match arg {
            Operand::Imm(_) | Operand::Reg(..) => out.push(Instruction::Push(arg)),
            _ => {
                // Memory operands bounce through EAX so the push is a full
                // 8-byte store.
                out.push(Instruction::Mov {
                    src: arg,
                    dst: Operand::Reg(Reg::Ax, 4),
                });
                out.push(Instruction::Push(Operand::Reg(Reg::Ax, 8)));
            }
        }
    }

    out.push(Instruction::Call(name.to_string()));

    let bytes_to_remove = 8 * stack_args.len() as i32 + stack_padding;
    if bytes_to_remove != 0 {
        out.push(Instruction::DeallocateStack(bytes_to_remove));
    }

    out.push(Instruction::Mov {
        src: Operand::Reg(Reg::Ax, 4),
        dst: operand(dst),
    });
}

// ----------------------------------------------------------------------
// Pseudo replacement
// ----------------------------------------------------------------------

/// Rewrite every `Pseudo` operand to a `Stack` slot or `Data` symbol and
/// record each function's frame requirement.
pub fn replace_pseudos(program: &mut asm::Program, symbols: &SymbolTable) {
    for top_level in &mut program.top_level {
        let asm::TopLevel::Function {
            instructions,
            stack_size,
            ..
        } = top_level
        else {
            continue;
        };

        let mut slots: HashMap<String, i32> = HashMap::new();
        let mut size = 0i32;
        for instruction in instructions.iter_mut() {
            for op in instruction_operands(instruction) {
                replace_operand(op, &mut slots, &mut size, symbols);
            }
        }
        *stack_size = Some(size);
    }
}

fn instruction_operands(instruction: &mut Instruction) -> Vec<&mut Operand> {
    match instruction {
        Instruction::Mov { src, dst } => vec![src, dst],
        Instruction::Unary { dst, .. } => vec![dst],
        Instruction::Binary { src, dst, .. } => vec![src, dst],
        Instruction::Cmp { left, right } => vec![left, right],
        Instruction::Idiv(divisor) => vec![divisor],
        Instruction::SetCC { dst, .. } => vec![dst],
        Instruction::Push(operand) => vec![operand],
        _ => Vec::new(),
    }
}

fn replace_operand(
    op: &mut Operand,
    slots: &mut HashMap<String, i32>,
    size: &mut i32,
    symbols: &SymbolTable,
) {
    let Operand::Pseudo(name) = op else {
        return;
    };
    let replacement = if let Some(offset) = slots.get(name.as_str()) {
        Operand::Stack(*offset)
    } else if symbols.get(name).is_some_and(|s| s.is_static()) {
        Operand::Data(name.clone())
    } else {
        *size -= 4;
        slots.insert(name.clone(), *size);
        Operand::Stack(*size)
    };
    *op = replacement;
}

// ----------------------------------------------------------------------
// Instruction fix-up
// ----------------------------------------------------------------------

pub fn fix_program(program: asm::Program) -> asm::Program {
    let top_level = program
        .top_level
        .into_iter()
        .map(|top_level| match top_level {
            asm::TopLevel::Function {
                name,
                global,
                instructions,
                stack_size,
            } => fix_function(name, global, instructions, stack_size),
            static_var => static_var,
        })
        .collect();
    asm::Program { top_level }
}

fn fix_function(
    name: String,
    global: bool,
    instructions: Vec<Instruction>,
    stack_size: Option<i32>,
) -> asm::TopLevel {
    let Some(stack_size) = stack_size else {
        unreachable!("stack size for {} not set before fix-up", name);
    };

    // Round down (more negative) to a 16-byte multiple so calls stay
    // aligned.
    let rounded = stack_size - stack_size.rem_euclid(16);
    debug_assert!(rounded % 16 == 0);

    let mut fixed = vec![Instruction::AllocateStack(rounded)];
    for instruction in instructions {
        fix_instruction(instruction, &mut fixed);
    }

    asm::TopLevel::Function {
        name,
        global,
        instructions: fixed,
        stack_size: Some(rounded),
    }
}

fn fix_instruction(instruction: Instruction, out: &mut Vec<Instruction>) {
    match instruction {
        Instruction::Mov { src, dst } if src.is_memory() && dst.is_memory() => {
            let r10 = Operand::Reg(Reg::R10, 4);
            out.push(Instruction::Mov {
                src,
                dst: r10.clone(),
            });
            out.push(Instruction::Mov { src: r10, dst });
        }
        Instruction::Binary {
            op: asm::BinaryOp::Imul,
            src,
            dst,
        } if dst.is_memory() => {
            let r11 = Operand::Reg(Reg::R11, 4);
            out.push(Instruction::Mov {
                src: dst.clone(),
                dst: r11.clone(),
            });
            out.push(Instruction::Binary {
                op: asm::BinaryOp::Imul,
                src,
                dst: r11.clone(),
            });
            out.push(Instruction::Mov { src: r11, dst });
        }
        Instruction::Binary { op, src, dst } if op.is_shift() => match src {
            Operand::Imm(_) | Operand::Reg(_, 1) => {
                out.push(Instruction::Binary { op, src, dst });
            }
            _ => {
                // Variable shift counts must go through CL.
                out.push(Instruction::Mov {
                    src,
                    dst: Operand::Reg(Reg::Cx, 4),
                });
                out.push(Instruction::Binary {
                    op,
                    src: Operand::Reg(Reg::Cx, 1),
                    dst,
                });
            }
        },
        Instruction::Binary { op, src, dst } if src.is_memory() && dst.is_memory() => {
            let r10 = Operand::Reg(Reg::R10, 4);
            out.push(Instruction::Mov {
                src,
                dst: r10.clone(),
            });
            out.push(Instruction::Binary { op, src: r10, dst });
        }
        Instruction::Cmp { left, right } if matches!(right, Operand::Imm(_)) => {
            let r11 = Operand::Reg(Reg::R11, 4);
            out.push(Instruction::Mov {
                src: right,
                dst: r11.clone(),
            });
            out.push(Instruction::Cmp { left, right: r11 });
        }
        Instruction::Cmp { left, right } if left.is_memory() && right.is_memory() => {
            let r10 = Operand::Reg(Reg::R10, 4);
            out.push(Instruction::Mov {
                src: left,
                dst: r10.clone(),
            });
            out.push(Instruction::Cmp { left: r10, right });
        }
        Instruction::Idiv(divisor @ Operand::Imm(_)) => {
            let r10 = Operand::Reg(Reg::R10, 4);
            out.push(Instruction::Mov {
                src: divisor,
                dst: r10.clone(),
            });
            out.push(Instruction::Idiv(r10));
        }
        legal => out.push(legal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::names::NameContext;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::tac::TacGen;
    use crate::typechecker::TypeChecker;

    fn compile(source: &str) -> asm::Program {
        let tokens = Lexer::new(source).lex().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let mut names = NameContext::new();
        let program = Resolver::new(&mut names).resolve(program).unwrap();
        let mut checker = TypeChecker::new();
        checker.check_program(&program).unwrap();
        let symbols = checker.into_symbols();
        let tac = TacGen::new(&mut names, &symbols).lower_program(&program);
        let mut assembly = gen_program(&tac);
        replace_pseudos(&mut assembly, &symbols);
        fix_program(assembly)
    }

    fn function<'p>(program: &'p asm::Program, wanted: &str) -> &'p [Instruction] {
        program
            .top_level
            .iter()
            .find_map(|tl| match tl {
                asm::TopLevel::Function {
                    name, instructions, ..
                } if name == wanted => Some(instructions.as_slice()),
                _ => None,
            })
            .unwrap()
    }

    fn operands(instruction: &Instruction) -> Vec<&Operand> {
        match instruction {
            Instruction::Mov { src, dst } => vec![src, dst],
            Instruction::Unary { dst, .. } => vec![dst],
            Instruction::Binary { src, dst, .. } => vec![src, dst],
            Instruction::Cmp { left, right } => vec![left, right],
            Instruction::Idiv(divisor) => vec![divisor],
            Instruction::SetCC { dst, .. } => vec![dst],
            Instruction::Push(operand) => vec![operand],
            _ => Vec::new(),
        }
    }

    fn assert_no_pseudos(program: &asm::Program) {
        for tl in &program.top_level {
            let asm::TopLevel::Function { instructions, .. } = tl else {
                continue;
            };
            for instruction in instructions {
                for op in operands(instruction) {
                    assert!(
                        !matches!(op, Operand::Pseudo(_)),
                        "pseudo survived fix-up: {:?}",
                        instruction
                    );
                }
            }
        }
    }

    #[test]
    fn test_no_pseudo_survives() {
        let program = compile(
            "static int n; int f(int a, int b) { return a * b + n; } \
             int main(void) { n = 3; return f(2, 3); }",
        );
        assert_no_pseudos(&program);
    }

    #[test]
    fn test_frame_allocation_is_16_byte_multiple() {
        let program = compile(
            "int main(void) { int a = 1; int b = 2; int c = 3; return a + b + c; }",
        );
        let body = function(&program, "main");
        let Instruction::AllocateStack(size) = body[0] else {
            panic!("expected AllocateStack first, got {:?}", body[0]);
        };
        assert!(size <= 0);
        assert_eq!(size % 16, 0);
        // Three locals plus temporaries need at least 3 slots.
        assert!(size <= -12);
    }

    #[test]
    fn test_zero_frame_still_allocates() {
        let program = compile("int main(void) { return 2; }");
        let body = function(&program, "main");
        assert_eq!(body[0], Instruction::AllocateStack(0));
    }

    #[test]
    fn test_mem_to_mem_mov_goes_through_r10() {
        let program = compile("int main(void) { int a = 1; int b = a; return b; }");
        let body = function(&program, "main");
        for instruction in body {
            if let Instruction::Mov { src, dst } = instruction {
                assert!(
                    !(src.is_memory() && dst.is_memory()),
                    "mem-to-mem mov survived: {:?}",
                    instruction
                );
            }
        }
        assert!(body.iter().any(|i| matches!(
            i,
            Instruction::Mov {
                dst: Operand::Reg(Reg::R10, 4),
                ..
            }
        )));
    }

    #[test]
    fn test_imul_destination_not_memory() {
        let program = compile("int main(void) { int a = 3; return a * 5; }");
        let body = function(&program, "main");
        for instruction in body {
            if let Instruction::Binary {
                op: asm::BinaryOp::Imul,
                dst,
                ..
            } = instruction
            {
                assert!(!dst.is_memory(), "imul into memory: {:?}", instruction);
            }
        }
    }

    #[test]
    fn test_idiv_never_takes_immediate() {
        let program = compile("int main(void) { return 10 / 2; }");
        let body = function(&program, "main");
        for instruction in body {
            if let Instruction::Idiv(divisor) = instruction {
                assert!(!matches!(divisor, Operand::Imm(_)));
            }
        }
        assert!(body.iter().any(|i| matches!(i, Instruction::Cdq)));
    }

    #[test]
    fn test_cmp_right_never_immediate() {
        let program = compile("int main(void) { int a = 1; return a < 2; }");
        let body = function(&program, "main");
        for instruction in body {
            if let Instruction::Cmp { right, .. } = instruction {
                assert!(!matches!(right, Operand::Imm(_)));
            }
        }
    }

    #[test]
    fn test_shift_count_goes_through_cl() {
        let program = compile("int main(void) { int a = 1; int b = 3; return a << b; }");
        let body = function(&program, "main");
        let shift = body
            .iter()
            .find_map(|i| match i {
                Instruction::Binary {
                    op: asm::BinaryOp::Sal,
                    src,
                    ..
                } => Some(src),
                _ => None,
            })
            .unwrap();
        assert_eq!(*shift, Operand::Reg(Reg::Cx, 1));
    }

    #[test]
    fn test_immediate_shift_count_is_left_alone() {
        let program = compile("int main(void) { int a = 1; return a << 2; }");
        let body = function(&program, "main");
        let shift = body
            .iter()
            .find_map(|i| match i {
                Instruction::Binary {
                    op: asm::BinaryOp::Sal,
                    src,
                    ..
                } => Some(src),
                _ => None,
            })
            .unwrap();
        assert_eq!(*shift, Operand::Imm(2));
    }

    #[test]
    fn test_static_variable_becomes_data_operand() {
        let program = compile("static int n = 5; int main(void) { return n; }");
        let body = function(&program, "main");
        assert!(body.iter().any(|i| {
            operands(i)
                .iter()
                .any(|op| matches!(op, Operand::Data(name) if name == "n"))
        }));
    }

    #[test]
    fn test_register_parameters_move_into_slots() {
        let program = compile("int f(int a, int b) { return a + b; } int main(void) { return f(1, 2); }");
        let body = function(&program, "f");
        // After AllocateStack, the first two instructions spill EDI and ESI.
        assert!(matches!(
            &body[1],
            Instruction::Mov {
                src: Operand::Reg(Reg::Di, 4),
                dst: Operand::Stack(_)
            }
        ));
        assert!(matches!(
            &body[2],
            Instruction::Mov {
                src: Operand::Reg(Reg::Si, 4),
                dst: Operand::Stack(_)
            }
        ));
    }

    #[test]
    fn test_seventh_parameter_loads_from_caller_frame() {
        let program = compile(
            "int f(int a, int b, int c, int d, int e, int g, int h) { return h; } \
             int main(void) { return f(1, 2, 3, 4, 5, 6, 7); }",
        );
        let body = function(&program, "f");
        assert!(body.iter().any(|i| matches!(
            i,
            Instruction::Mov {
                src: Operand::Stack(16),
                ..
            }
        )));
    }

    #[test]
    fn test_call_with_odd_stack_args_pads() {
        let program = compile(
            "int f(int a, int b, int c, int d, int e, int g, int h) { return h; } \
             int main(void) { return f(1, 2, 3, 4, 5, 6, 7); }",
        );
        let body = function(&program, "main");
        // One stack argument: 8 bytes of padding, then pop 16 after the call.
        assert!(body.iter().any(|i| matches!(i, Instruction::AllocateStack(-8))));
        assert!(body
            .iter()
            .any(|i| matches!(i, Instruction::DeallocateStack(16))));
        assert!(body.iter().any(|i| matches!(
            i,
            Instruction::Push(Operand::Imm(7))
        )));
    }

    #[test]
    fn test_call_with_register_args_only() {
        let program = compile("int f(int a) { return a; } int main(void) { return f(9); }");
        let body = function(&program, "main");
        assert!(body.iter().any(|i| matches!(
            i,
            Instruction::Mov {
                src: Operand::Imm(9),
                dst: Operand::Reg(Reg::Di, 4)
            }
        )));
        assert!(!body
            .iter()
            .any(|i| matches!(i, Instruction::DeallocateStack(_))));
        // The return value lands in the call's destination slot.
        assert!(body.iter().any(|i| matches!(
            i,
            Instruction::Mov {
                src: Operand::Reg(Reg::Ax, 4),
                dst: Operand::Stack(_)
            }
        )));
    }

    #[test]
    fn test_relational_uses_setcc() {
        let program = compile("int main(void) { int a = 1; return a == 1; }");
        let body = function(&program, "main");
        assert!(body.iter().any(|i| matches!(
            i,
            Instruction::SetCC {
                cond: CondCode::E,
                ..
            }
        )));
    }

    #[test]
    fn test_stack_slots_are_4_bytes_apart() {
        let program = compile("int main(void) { int a = 1; int b = 2; return a + b; }");
        let body = function(&program, "main");
        let mut offsets: Vec<i32> = body
            .iter()
            .flat_map(operands)
            .filter_map(|op| match op {
                Operand::Stack(offset) if *offset < 0 => Some(*offset),
                _ => None,
            })
            .collect();
        offsets.sort_unstable();
        offsets.dedup();
        for pair in offsets.windows(2) {
            assert_eq!(pair[1] - pair[0], 4);
        }
    }
}
