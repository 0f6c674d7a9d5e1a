use hashbrown::HashSet;
use itertools::Itertools;

use super::namespace::Namespace;
use crate::{
    error::{internal_error, CompileResult},
    frontend::{
        ast::{
            Application, BinaryOperator, Call, Function, LogicalOperator, Node, NodeKind, Program,
            UnaryOperator,
        },
        intern::InternedSymbol,
    },
    middle::{
        ty::{Type, TypeKind},
        type_check::subtype::is_subtype,
    },
};

/// Name the runtime module is imported under
pub const RUNTIME_BINDING: &str = "$rt";

const LOOP_LABEL: &str = "$tco";
const INDENT: &str = "    ";

/// Generates JavaScript for a normalized program
pub fn emit(program: &Program, namespace: &mut Namespace) -> CompileResult<String> {
    let mut emitter = Emitter {
        namespace,
        output: String::new(),
        indent: 0,
        scopes: Vec::new(),
        tail_targets: Vec::new(),
    };

    emitter.scopes.push(bound_in(&program.body));

    for node in &program.body {
        emitter.statement(node, &Destination::Discard)?;
    }

    log::trace!("emitted {} bytes", emitter.output.len());

    Ok(emitter.output)
}

/// Where the value of a statement goes
#[derive(Debug, Clone, PartialEq, Eq)]
enum Destination {
    Return,
    Assign(String),
    Discard,
}

/// Loop variables of the tail recursive function being emitted. Each
/// iteration copies them into fresh bindings of the parameter names, so
/// closures made in one iteration never see the next one's arguments.
#[derive(Debug, Clone)]
struct TailTarget {
    fixed: Vec<String>,
    rest: Option<String>,
}

struct Emitter<'ns> {
    namespace: &'ns mut Namespace,
    output: String,
    indent: usize,
    /// Names declared by the program, per enclosing block
    scopes: Vec<HashSet<InternedSymbol>>,
    tail_targets: Vec<Option<TailTarget>>,
}

/// Names declared directly in a block
fn bound_in(body: &[Node]) -> HashSet<InternedSymbol> {
    let mut names = HashSet::new();

    for node in body {
        match &node.kind {
            NodeKind::VariableDeclaration(declaration)
            | NodeKind::ConstantDeclaration(declaration) => {
                names.extend(declaration.target.bound_names());
            }
            NodeKind::FunctionDeclaration(Function {
                name: Some(name), ..
            }) => {
                names.insert(*name);
            }
            NodeKind::Import { alias, .. } => {
                names.insert(*alias);
            }
            _ => {}
        }
    }

    names
}

pub(crate) fn js_string(value: &str) -> String {
    let mut output = String::with_capacity(value.len() + 2);

    output.push('"');

    for c in value.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            '\u{2028}' | '\u{2029}' => output.push_str(&format!("\\u{:04x}", c as u32)),
            c if c.is_control() => output.push_str(&format!("\\u{:04x}", c as u32)),
            c => output.push(c),
        }
    }

    output.push('"');
    output
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();

    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Whether a node can be written as a single JavaScript expression
fn is_expression(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Number { .. }
        | NodeKind::String(_)
        | NodeKind::Boolean(_)
        | NodeKind::Keyword(_)
        | NodeKind::Nil
        | NodeKind::Symbol(_)
        | NodeKind::Vector(_)
        | NodeKind::Record(_)
        | NodeKind::Member { .. }
        | NodeKind::Lambda(_)
        | NodeKind::Binary { .. }
        | NodeKind::Unary { .. } => true,
        NodeKind::Call(call) => !call.is_tail_rec,
        NodeKind::As { expression, .. } => is_expression(expression),
        NodeKind::Logical { left, right, .. } => is_expression(left) && is_expression(right),
        _ => false,
    }
}

/// Statically known booleans can be tested without the runtime
fn is_boolean(node: &Node) -> bool {
    node.ty.as_ref().is_some_and(|ty| {
        let gradual = matches!(
            &*ty.unalias(),
            TypeKind::Any | TypeKind::Undefined | TypeKind::Unknown
        );

        !gradual && is_subtype(ty, &Type::boolean())
    })
}

impl<'ns> Emitter<'ns> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str(INDENT);
        }

        self.output.push_str(text);
        self.output.push('\n');
    }

    /// Emits into a separate buffer, one level deeper
    fn capture(
        &mut self,
        f: impl FnOnce(&mut Self) -> CompileResult<()>,
    ) -> CompileResult<String> {
        let outer = std::mem::take(&mut self.output);

        self.indent += 1;
        let result = f(self);
        self.indent -= 1;

        let inner = std::mem::replace(&mut self.output, outer);

        result.map(|_| inner)
    }

    fn closing_indent(&self) -> String {
        INDENT.repeat(self.indent)
    }

    fn name(&mut self, name: InternedSymbol) -> String {
        if self.scopes.iter().any(|scope| scope.contains(&name)) {
            self.namespace.resolve_local(name)
        } else {
            self.namespace.resolve(name)
        }
    }

    fn local_name(&mut self, name: InternedSymbol) -> String {
        self.namespace.resolve_local(name)
    }

    fn deliver(&mut self, expression: &str, destination: &Destination) {
        match destination {
            Destination::Return => self.line(&format!("return {expression};")),
            Destination::Assign(target) => self.line(&format!("{target} = {expression};")),
            // These would start a block or a declaration
            Destination::Discard
                if expression.starts_with('{') || expression.starts_with("function") =>
            {
                self.line(&format!("({expression});"))
            }
            Destination::Discard => self.line(&format!("{expression};")),
        }
    }

    /// Statements evaluate to nil
    fn deliver_nil(&mut self, destination: &Destination) {
        if *destination != Destination::Discard {
            self.deliver("null", destination);
        }
    }

    fn block(&mut self, body: &[Node], destination: &Destination) -> CompileResult<()> {
        self.scopes.push(bound_in(body));

        let result = self.block_statements(body, destination);

        self.scopes.pop();

        result
    }

    fn block_statements(&mut self, body: &[Node], destination: &Destination) -> CompileResult<()> {
        let Some((last, init)) = body.split_last() else {
            self.deliver_nil(destination);
            return Ok(());
        };

        for node in init {
            self.statement(node, &Destination::Discard)?;
        }

        self.statement(last, destination)
    }

    fn statement(&mut self, node: &Node, destination: &Destination) -> CompileResult<()> {
        match &node.kind {
            NodeKind::VariableDeclaration(declaration)
            | NodeKind::ConstantDeclaration(declaration) => {
                let Some(name) = declaration.target.as_identifier() else {
                    return Err(internal_error!(
                        "destructuring declaration at {} reached the emitter",
                        node.location
                    ));
                };

                let name = self.local_name(name);
                let keyword = match node.kind {
                    NodeKind::ConstantDeclaration(_) => "const",
                    _ => "let",
                };

                if is_expression(&declaration.init) {
                    let init = self.expression(&declaration.init)?;

                    self.line(&format!("{keyword} {name} = {init};"));
                } else {
                    self.line(&format!("let {name};"));
                    self.statement(&declaration.init, &Destination::Assign(name))?;
                }

                self.deliver_nil(destination);
            }
            NodeKind::Set { name, value } => {
                let name = self.name(*name);

                if is_expression(value) {
                    let value = self.expression(value)?;

                    self.line(&format!("{name} = {value};"));
                } else {
                    self.statement(value, &Destination::Assign(name))?;
                }

                self.deliver_nil(destination);
            }
            NodeKind::FunctionDeclaration(function) => {
                let Some(name) = function.name else {
                    return Err(internal_error!("function declaration without a name"));
                };

                let name = self.local_name(name);
                let params = self.params(function);
                let body = self.function_body(function, None)?;

                self.line(&format!("function {name}({}) {{", params.join(", ")));
                self.output.push_str(&body);
                self.line("}");

                if *destination != Destination::Discard {
                    self.deliver(&name, destination);
                }
            }
            NodeKind::TypeAlias { .. } => self.deliver_nil(destination),
            NodeKind::Import { name, alias } => {
                let alias = self.local_name(*alias);

                self.line(&format!("import * as {alias} from {};", js_string(name)));
                self.deliver_nil(destination);
            }
            NodeKind::Do(body) => {
                self.line("{");
                self.indent += 1;
                let result = self.block(body, destination);
                self.indent -= 1;
                self.line("}");

                result?;
            }
            NodeKind::If {
                test,
                then,
                otherwise,
            } => {
                let test = self.test(test)?;
                let then = self.capture(|emitter| emitter.branch_body(then, destination))?;
                let otherwise =
                    self.capture(|emitter| emitter.branch_body(otherwise, destination))?;

                self.line(&format!("if ({test}) {{"));
                self.output.push_str(&then);

                if !otherwise.is_empty() {
                    self.line("} else {");
                    self.output.push_str(&otherwise);
                }

                self.line("}");
            }
            NodeKind::For {
                target,
                iterable,
                body,
            } => {
                let Some(target) = target.as_identifier() else {
                    return Err(internal_error!(
                        "destructuring loop target at {} reached the emitter",
                        node.location
                    ));
                };

                let iterable = self.expression(iterable)?;
                let target_name = self.local_name(target);

                self.line(&format!("for (const {target_name} of {iterable}) {{"));
                self.indent += 1;

                let mut scope = bound_in(body);
                scope.insert(target);
                self.scopes.push(scope);

                let result = body
                    .iter()
                    .try_for_each(|node| self.statement(node, &Destination::Discard));

                self.scopes.pop();
                self.indent -= 1;
                self.line("}");

                result?;
                self.deliver_nil(destination);
            }
            NodeKind::Logical {
                operator,
                left,
                right,
            } if !is_expression(node) => {
                let test = self.test(left)?;
                let left_value = self.expression(left)?;

                self.line(&format!("if ({test}) {{"));

                match operator {
                    LogicalOperator::And => {
                        self.branch(right, destination)?;
                        self.line("} else {");
                        self.indent += 1;
                        self.deliver(&left_value, destination);
                        self.indent -= 1;
                    }
                    LogicalOperator::Or => {
                        self.indent += 1;
                        self.deliver(&left_value, destination);
                        self.indent -= 1;
                        self.line("} else {");
                        self.branch(right, destination)?;
                    }
                }

                self.line("}");
            }
            NodeKind::Call(call) if call.is_tail_rec => self.tail_call(call)?,
            NodeKind::Cond(_) | NodeKind::When { .. } => {
                return Err(internal_error!(
                    "conditional at {} wasn't lowered before emission",
                    node.location
                ))
            }
            _ => {
                let expression = self.expression(node)?;

                self.deliver(&expression, destination);
            }
        }

        Ok(())
    }

    fn branch(&mut self, node: &Node, destination: &Destination) -> CompileResult<()> {
        self.indent += 1;
        let result = self.branch_body(node, destination);
        self.indent -= 1;

        result
    }

    fn branch_body(&mut self, node: &Node, destination: &Destination) -> CompileResult<()> {
        match &node.kind {
            NodeKind::Do(body) => self.block(body, destination),
            // A missing `else` reads as nil
            NodeKind::Nil if *destination == Destination::Discard => Ok(()),
            _ => self.statement(node, destination),
        }
    }

    fn tail_call(&mut self, call: &Call) -> CompileResult<()> {
        let Some(Some(target)) = self.tail_targets.last().cloned() else {
            return Err(internal_error!(
                "tail call outside of a tail recursive function"
            ));
        };

        let args = call
            .args
            .iter()
            .map(|arg| self.expression(arg))
            .collect::<CompileResult<Vec<_>>>()?;

        let (fixed, extra) = args.split_at(target.fixed.len().min(args.len()));
        let mut targets = target.fixed.clone();
        let mut values = fixed.to_vec();

        if let Some(rest) = target.rest {
            targets.push(rest);
            values.push(format!("[{}]", extra.iter().join(", ")));
        }

        if !targets.is_empty() {
            self.line(&format!(
                "[{}] = [{}];",
                targets.iter().join(", "),
                values.iter().join(", ")
            ));
        }

        self.line(&format!("continue {LOOP_LABEL};"));

        Ok(())
    }

    /// A test expression evaluated for truthiness
    fn test(&mut self, node: &Node) -> CompileResult<String> {
        let expression = self.expression(node)?;

        Ok(if is_boolean(node) {
            expression
        } else {
            format!("{RUNTIME_BINDING}.truthy({expression})")
        })
    }

    /// Variable carrying a parameter's value from one loop iteration to the
    /// next. Output names never end in `$` otherwise.
    fn carrier(&mut self, name: InternedSymbol) -> String {
        format!("{}$", self.local_name(name))
    }

    fn params(&mut self, function: &Function) -> Vec<String> {
        function
            .params
            .iter()
            .map(|param| {
                let names = param.target.bound_names();
                let name = match (names.as_slice(), function.is_tail_recursive) {
                    ([name], true) => self.carrier(*name),
                    ([name], false) => self.local_name(*name),
                    _ => "_".to_owned(),
                };

                match param.is_rest {
                    true => format!("...{name}"),
                    false => name,
                }
            })
            .collect()
    }

    /// Emits a function body one level deeper, tail recursive bodies inside a
    /// labelled loop
    fn function_body(
        &mut self,
        function: &Function,
        own_name: Option<InternedSymbol>,
    ) -> CompileResult<String> {
        let mut scope = bound_in(&function.body);

        scope.extend(function.params.iter().flat_map(|param| param.target.bound_names()));
        scope.extend(own_name);

        let target = match function.is_tail_recursive {
            true => Some(TailTarget {
                fixed: function
                    .fixed_params()
                    .iter()
                    .flat_map(|param| param.target.bound_names())
                    .map(|name| self.carrier(name))
                    .collect(),
                rest: function
                    .rest_param()
                    .and_then(|param| param.target.as_identifier())
                    .map(|name| self.carrier(name)),
            }),
            false => None,
        };

        let iteration_bindings = function
            .params
            .iter()
            .flat_map(|param| param.target.bound_names())
            .map(|name| {
                let local = self.local_name(name);
                let carrier = self.carrier(name);

                format!("{local} = {carrier}")
            })
            .collect::<Vec<_>>();

        self.scopes.push(scope);
        self.tail_targets.push(target);

        let result = self.capture(|emitter| {
            if function.is_tail_recursive {
                emitter.line(&format!("{LOOP_LABEL}: while (true) {{"));
                emitter.indent += 1;

                if !iteration_bindings.is_empty() {
                    emitter.line(&format!("let {};", iteration_bindings.join(", ")));
                }

                let result = emitter.block_statements(&function.body, &Destination::Return);
                emitter.indent -= 1;
                emitter.line("}");

                result
            } else {
                emitter.block_statements(&function.body, &Destination::Return)
            }
        });

        self.tail_targets.pop();
        self.scopes.pop();

        result
    }

    fn lambda(&mut self, function: &Function) -> CompileResult<String> {
        let own_name = function.name;

        // Names are bound inside their own body
        let named = own_name.map(|name| {
            let mut scope = HashSet::new();
            scope.insert(name);
            scope
        });

        if let Some(scope) = &named {
            self.scopes.push(scope.clone());
        }

        let params = self.params(function).join(", ");
        let body = self.function_body(function, own_name);

        if named.is_some() {
            self.scopes.pop();
        }

        let body = body?;
        let closing = self.closing_indent();

        Ok(match own_name {
            Some(name) => {
                let name = self.local_name(name);

                format!("function {name}({params}) {{\n{body}{closing}}}")
            }
            None => format!("({params}) => {{\n{body}{closing}}}"),
        })
    }

    fn expression(&mut self, node: &Node) -> CompileResult<String> {
        let expression = match &node.kind {
            NodeKind::Number { text, .. } => text.strip_prefix('+').unwrap_or(text).to_owned(),
            NodeKind::String(value) => js_string(value),
            NodeKind::Boolean(value) => value.to_string(),
            NodeKind::Keyword(name) => format!("Symbol.for({})", js_string(name.value())),
            NodeKind::Nil => "null".to_owned(),
            NodeKind::Symbol(name) => self.name(*name),
            NodeKind::Call(call) => {
                let callee = self.expression(&call.callee)?;
                let callee = match call.callee.kind {
                    NodeKind::Lambda(_) => format!("({callee})"),
                    _ => callee,
                };

                let mut args = call
                    .args
                    .iter()
                    .map(|arg| self.expression(arg))
                    .collect::<CompileResult<Vec<_>>>()?;

                match call.application {
                    Application::Full => format!("{callee}({})", args.join(", ")),
                    // Binding evaluates the supplied arguments now, like a call would
                    Application::Partial { .. } => {
                        args.insert(0, "null".to_owned());

                        format!("{callee}.bind({})", args.join(", "))
                    }
                }
            }
            NodeKind::Vector(elements) => {
                let elements = elements
                    .iter()
                    .map(|element| self.expression(element))
                    .collect::<CompileResult<Vec<_>>>()?;

                format!("[{}]", elements.join(", "))
            }
            NodeKind::Record(properties) if properties.is_empty() => "{}".to_owned(),
            NodeKind::Record(properties) => {
                let properties = properties
                    .iter()
                    .map(|property| {
                        let key = property.key.value();
                        let key = match is_plain_key(key) {
                            true => key.to_owned(),
                            false => js_string(key),
                        };

                        Ok(format!("{key}: {}", self.expression(&property.value)?))
                    })
                    .collect::<CompileResult<Vec<_>>>()?;

                format!("{{ {} }}", properties.join(", "))
            }
            NodeKind::Member { object, property } => {
                let object = self.expression(object)?;
                let key = property.value();

                match is_plain_key(key) {
                    true => format!("{object}.{key}"),
                    false => format!("{object}[{}]", js_string(key)),
                }
            }
            NodeKind::Lambda(function) => self.lambda(function)?,
            NodeKind::As { expression, .. } => self.expression(expression)?,
            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.expression(left)?;
                let right = self.expression(right)?;

                match operator {
                    BinaryOperator::Equal => format!("{RUNTIME_BINDING}.equals({left}, {right})"),
                    BinaryOperator::NotEqual => {
                        format!("!{RUNTIME_BINDING}.equals({left}, {right})")
                    }
                    _ => format!("({left} {operator} {right})"),
                }
            }
            NodeKind::Logical {
                operator,
                left,
                right,
            } => {
                let test = self.test(left)?;
                let left = self.expression(left)?;
                let right = self.expression(right)?;

                match operator {
                    LogicalOperator::And => format!("({test} ? {right} : {left})"),
                    LogicalOperator::Or => format!("({test} ? {left} : {right})"),
                }
            }
            NodeKind::Unary { operator, operand } => match operator {
                UnaryOperator::Not if is_boolean(operand) => {
                    format!("!{}", self.expression(operand)?)
                }
                UnaryOperator::Not => format!("!{}", self.test(operand)?),
                UnaryOperator::Typeof => format!("typeof {}", self.expression(operand)?),
            },
            _ => {
                return Err(internal_error!(
                    "statement at {} used as an expression",
                    node.location
                ))
            }
        };

        Ok(expression)
    }
}
