//! Tree-walking code generator for the stack architecture with vector
//! extensions (`spec.md` §4.C). Grounded on
//! `original_source/lang/codegen.py::CodeGenerator`: same visitor-style
//! dispatch and forward-patching, restructured as a `match` over a closed
//! `Node` enum instead of a `visit_*` method per subclass, and returning
//! `Result<_, CodeGenError>` instead of raising — compilation aborts on the
//! first error, matching `spec.md` §7.

pub mod ast;
mod builtins;
pub mod symtab;

use ast::{AssignOp, BinaryOp, Node, UnaryOp};
use symtab::{Binding, SymbolTable};

use crate::error::CodeGenError;
use crate::machine_code::MachineCode;
use crate::opcode::Opcode;

/// Reserved ports used by the generator's builtin expansions (`spec.md` §4.D).
const INPUT_PORT: u32 = 0;
const OUTPUT_PORT: u32 = 1;

struct LoopLabels {
    continue_addr: u32,
    break_jump: u32,
}

pub struct CodeGenerator {
    machine_code: MachineCode,
    symbols: SymbolTable,
    loop_stack: Vec<LoopLabels>,
}

impl CodeGenerator {
    pub fn new() -> CodeGenerator {
        CodeGenerator {
            machine_code: MachineCode::new(),
            symbols: SymbolTable::new(),
            loop_stack: Vec::new(),
        }
    }

    pub fn generate(mut self, program: &Node) -> Result<MachineCode, CodeGenError> {
        self.visit(program)?;
        self.emit(Opcode::Halt, 0);
        Ok(self.machine_code)
    }

    fn emit(&mut self, opcode: Opcode, operand: u32) -> u32 {
        self.machine_code.emit(crate::instruction::Instruction::new(opcode, operand))
    }

    fn patch(&mut self, address: u32, target: u32) {
        self.machine_code.patch_operand(address, target);
    }

    fn here(&self) -> u32 {
        self.machine_code.next_instruction_address()
    }

    fn string_address(&mut self, text: &str) -> u32 {
        let mc = &mut self.machine_code;
        self.symbols.intern_string(text, || mc.add_cstring(text))
    }

    fn visit(&mut self, node: &Node) -> Result<(), CodeGenError> {
        match node {
            Node::Program(statements) => {
                for stmt in statements {
                    self.visit(stmt)?;
                }
                Ok(())
            }

            Node::NumberLiteral(value) => {
                if value.fract() != 0.0 {
                    let addr = self.machine_code.add_data(&(*value as f32).to_le_bytes());
                    self.emit(Opcode::Push, addr);
                    self.emit(Opcode::Load, 0);
                } else {
                    self.emit(Opcode::Push, *value as i64 as u32);
                }
                Ok(())
            }

            Node::StringLiteral(text) => {
                let addr = self.string_address(text);
                self.emit(Opcode::Push, addr);
                Ok(())
            }

            Node::BooleanLiteral(value) => {
                self.emit(Opcode::Push, u32::from(*value));
                Ok(())
            }

            Node::NullLiteral => {
                self.emit(Opcode::Push, 0);
                Ok(())
            }

            Node::Identifier(name) => self.visit_identifier(name),

            Node::BinaryOperation { left, operator, right } => {
                self.visit(left)?;
                self.visit(right)?;
                self.emit(binary_opcode(*operator), 0);
                Ok(())
            }

            Node::UnaryOperation { operator, operand } => {
                self.visit(operand)?;
                self.emit(
                    match operator {
                        UnaryOp::Neg => Opcode::Neg,
                        UnaryOp::Not => Opcode::Not,
                    },
                    0,
                );
                Ok(())
            }

            Node::FunctionCall { name, arguments } => self.visit_call(name, arguments),

            Node::VectorLiteral { elements } => self.visit_vector_literal(elements),

            Node::ArrayAccess { array, index } => {
                self.visit(array)?;
                self.visit(index)?;
                // Element i of a [len][e0][e1]...] buffer lives at addr + 4 + i*4.
                self.emit(Opcode::Push, 4);
                self.emit(Opcode::Mul, 0);
                self.emit(Opcode::Push, 4);
                self.emit(Opcode::Add, 0);
                self.emit(Opcode::Add, 0);
                self.emit(Opcode::Load, 0);
                Ok(())
            }

            Node::ExpressionStatement(expr) => {
                if let Node::FunctionCall { .. } = expr.as_ref() {
                    // Builtins/calls manage their own stack effect.
                    self.visit(expr)
                } else {
                    self.visit(expr)?;
                    self.emit(Opcode::Pop, 0);
                    Ok(())
                }
            }

            Node::VarDeclaration { name, initializer, is_const } => {
                match initializer {
                    Some(expr) => self.visit(expr)?,
                    None => {
                        self.emit(Opcode::Push, 0);
                    }
                }
                let addr = self.machine_code.add_word(0);
                self.emit(Opcode::Push, addr);
                self.emit(Opcode::Store, 0);
                self.symbols.define(name, Binding::Memory { address: addr, is_const: *is_const });
                Ok(())
            }

            Node::Assignment { target, operator, value } => {
                self.visit_assignment(target, *operator, value)
            }

            Node::Block(statements) => {
                self.symbols.enter_scope();
                let result = statements.iter().try_for_each(|s| self.visit(s));
                self.symbols.exit_scope();
                result
            }

            Node::IfStatement { condition, then_branch, else_branch } => {
                self.visit_if(condition, then_branch, else_branch.as_deref())
            }

            Node::WhileStatement { condition, body } => self.visit_while(condition, body),

            Node::ForStatement { init, condition, update, body } => {
                self.visit_for(init.as_deref(), condition.as_deref(), update.as_deref(), body)
            }

            Node::FunctionDeclaration { name, parameters, body } => {
                self.visit_function_declaration(name, parameters, body)
            }

            Node::ReturnStatement(value) => {
                match value {
                    Some(expr) => self.visit(expr)?,
                    None => {
                        self.emit(Opcode::Push, 0);
                    }
                }
                self.emit(Opcode::Ret, 0);
                Ok(())
            }
        }
    }

    fn visit_identifier(&mut self, name: &str) -> Result<(), CodeGenError> {
        if let Some(addr) = self.symbols.function_address(name) {
            self.emit(Opcode::Push, addr);
            return Ok(());
        }
        match self.symbols.get(name)? {
            Binding::Memory { address, .. } => {
                self.emit(Opcode::Push, address);
                self.emit(Opcode::Load, 0);
            }
            Binding::Literal(value) => {
                self.emit(Opcode::Push, value);
            }
        }
        Ok(())
    }

    fn visit_assignment(
        &mut self,
        target: &str,
        operator: AssignOp,
        value: &Node,
    ) -> Result<(), CodeGenError> {
        let binding = self.symbols.get(target)?;
        let address = match binding {
            Binding::Memory { is_const: true, .. } => {
                return Err(CodeGenError::ConstReassignment(target.to_string()));
            }
            Binding::Memory { address, is_const: false } => address,
            Binding::Literal(_) => return Err(CodeGenError::ConstReassignment(target.to_string())),
        };

        self.visit(value)?;
        match operator {
            AssignOp::Set => {}
            AssignOp::AddAssign => {
                self.emit(Opcode::Push, address);
                self.emit(Opcode::Load, 0);
                self.emit(Opcode::Add, 0);
            }
            AssignOp::SubAssign => {
                self.emit(Opcode::Push, address);
                self.emit(Opcode::Load, 0);
                self.emit(Opcode::Sub, 0);
            }
        }
        self.emit(Opcode::Push, address);
        self.emit(Opcode::Store, 0);
        Ok(())
    }

    fn visit_if(
        &mut self,
        condition: &Node,
        then_branch: &Node,
        else_branch: Option<&Node>,
    ) -> Result<(), CodeGenError> {
        self.visit(condition)?;
        let jump_to_else = self.emit(Opcode::Jz, 0);
        self.visit(then_branch)?;

        match else_branch {
            Some(else_stmt) => {
                let jump_to_end = self.emit(Opcode::Jmp, 0);
                let else_addr = self.here();
                self.patch(jump_to_else, else_addr);
                self.visit(else_stmt)?;
                let end_addr = self.here();
                self.patch(jump_to_end, end_addr);
            }
            None => {
                let end_addr = self.here();
                self.patch(jump_to_else, end_addr);
            }
        }
        Ok(())
    }

    fn visit_while(&mut self, condition: &Node, body: &Node) -> Result<(), CodeGenError> {
        let loop_start = self.here();
        self.visit(condition)?;
        let jump_to_end = self.emit(Opcode::Jz, 0);

        self.loop_stack.push(LoopLabels { continue_addr: loop_start, break_jump: jump_to_end });
        let result = self.visit(body);
        self.loop_stack.pop();
        result?;

        self.emit(Opcode::Jmp, loop_start);
        let end_addr = self.here();
        self.patch(jump_to_end, end_addr);
        Ok(())
    }

    fn visit_for(
        &mut self,
        init: Option<&Node>,
        condition: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
    ) -> Result<(), CodeGenError> {
        self.symbols.enter_scope();
        let result = (|| {
            if let Some(init) = init {
                self.visit(init)?;
            }

            let loop_start = self.here();
            let jump_to_end = match condition {
                Some(cond) => {
                    self.visit(cond)?;
                    Some(self.emit(Opcode::Jz, 0))
                }
                None => None,
            };

            if let Some(jump_to_end) = jump_to_end {
                self.loop_stack.push(LoopLabels { continue_addr: self.here(), break_jump: jump_to_end });
            }
            let body_result = self.visit(body);
            if jump_to_end.is_some() {
                self.loop_stack.pop();
            }
            body_result?;

            if let Some(update) = update {
                self.visit(update)?;
                self.emit(Opcode::Pop, 0);
            }

            self.emit(Opcode::Jmp, loop_start);

            if let Some(jump_to_end) = jump_to_end {
                let end_addr = self.here();
                self.patch(jump_to_end, end_addr);
            }
            Ok(())
        })();
        self.symbols.exit_scope();
        result
    }

    fn visit_function_declaration(
        &mut self,
        name: &str,
        parameters: &[String],
        body: &Node,
    ) -> Result<(), CodeGenError> {
        let skip_jump = self.emit(Opcode::Jmp, 0);

        let func_addr = self.here();
        self.symbols.define_function(name, func_addr);
        self.symbols.enter_scope();

        for param in parameters.iter().rev() {
            let addr = self.machine_code.add_word(0);
            self.emit(Opcode::Push, addr);
            self.emit(Opcode::Store, 0);
            self.symbols.define(param, Binding::Memory { address: addr, is_const: false });
        }

        let body_result = self.visit(body);
        self.emit(Opcode::Ret, 0);
        self.symbols.exit_scope();
        body_result?;

        let end_addr = self.here();
        self.patch(skip_jump, end_addr);
        Ok(())
    }

    fn visit_call(&mut self, name: &str, arguments: &[Node]) -> Result<(), CodeGenError> {
        if builtins::is_builtin(name) {
            return self.generate_builtin(name, arguments);
        }
        match self.symbols.function_address(name) {
            Some(addr) => {
                for arg in arguments {
                    self.visit(arg)?;
                }
                self.emit(Opcode::Call, addr);
                Ok(())
            }
            None => Err(CodeGenError::UnknownFunction(name.to_string())),
        }
    }

    fn visit_vector_literal(&mut self, elements: &[Node]) -> Result<(), CodeGenError> {
        let mut words = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Node::NumberLiteral(value) => words.push(*value as i64 as u32),
                _ => return Err(CodeGenError::UnsupportedOperator("vector literal element".into())),
            }
        }
        let addr = self.machine_code.add_vector_literal(&words);
        self.emit(Opcode::Push, addr);
        Ok(())
    }
}

impl Default for CodeGenerator {
    fn default() -> CodeGenerator {
        CodeGenerator::new()
    }
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Ne => Opcode::Ne,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Le => Opcode::Le,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Ge => Opcode::Ge,
        BinaryOp::And => Opcode::And,
        BinaryOp::Or => Opcode::Or,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;

    #[test]
    fn number_literal_pushes_its_integer_value() {
        let program = Node::Program(vec![Node::ExpressionStatement(Box::new(Node::NumberLiteral(42.0)))]);
        let mc = CodeGenerator::new().generate(&program).unwrap();
        assert_eq!(mc.instructions()[0], Instruction::new(Opcode::Push, 42));
    }

    #[test]
    fn var_declaration_then_identifier_round_trips_through_memory() {
        let program = Node::Program(vec![
            Node::VarDeclaration {
                name: "x".into(),
                initializer: Some(Box::new(Node::NumberLiteral(7.0))),
                is_const: false,
            },
            Node::ExpressionStatement(Box::new(Node::Identifier("x".into()))),
        ]);
        let mc = CodeGenerator::new().generate(&program).unwrap();
        // Program ends with an implicit HALT.
        assert_eq!(mc.instructions().last().unwrap().opcode, Opcode::Halt);
    }

    #[test]
    fn reassigning_a_const_is_a_code_gen_error() {
        let program = Node::Program(vec![
            Node::VarDeclaration {
                name: "x".into(),
                initializer: Some(Box::new(Node::NumberLiteral(1.0))),
                is_const: true,
            },
            Node::Assignment {
                target: "x".into(),
                operator: AssignOp::Set,
                value: Box::new(Node::NumberLiteral(2.0)),
            },
        ]);
        assert!(CodeGenerator::new().generate(&program).is_err());
    }

    #[test]
    fn if_without_else_patches_the_jz_to_the_end() {
        let program = Node::Program(vec![Node::IfStatement {
            condition: Box::new(Node::BooleanLiteral(true)),
            then_branch: Box::new(Node::Block(vec![])),
            else_branch: None,
        }]);
        let mc = CodeGenerator::new().generate(&program).unwrap();
        let jz = mc.instructions().iter().find(|i| i.opcode == Opcode::Jz).unwrap();
        assert_eq!(jz.operand as usize, mc.instructions().len() - 1);
    }

    #[test]
    fn calling_an_undefined_function_is_an_error() {
        let program = Node::Program(vec![Node::ExpressionStatement(Box::new(Node::FunctionCall {
            name: "nope".into(),
            arguments: vec![],
        }))]);
        assert!(CodeGenerator::new().generate(&program).is_err());
    }
}
