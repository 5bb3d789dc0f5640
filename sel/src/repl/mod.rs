//! REPL (Read-Eval-Print Loop) for SEL

use crate::eval::{ContextRef, Engine, FunctionResult, MapContext, Number, Value};
use crate::model::Element;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;
use std::rc::Rc;

const PROMPT: &str = "sel> ";
const HISTORY_FILE: &str = ".sel_history";

/// REPL state. Host variables persist across lines.
pub struct Repl {
    editor: DefaultEditor,
    engine: Engine,
    variables: Rc<MapContext>,
    element: Option<Element>,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new(engine: Engine) -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            engine,
            variables: MapContext::new(),
            element: None,
            history_path,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Evaluate lines against `element`, with variables as fallback
    pub fn with_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    pub fn variables(&self) -> &Rc<MapContext> {
        &self.variables
    }

    pub fn run(&mut self) -> RlResult<()> {
        println!("SEL REPL v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }
                    println!("{}", self.eval_line(line));
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }
        if let Some(element) = self.element.take() {
            element.dispose();
        }
        Ok(())
    }

    /// Handle a `:` command; true ends the session
    fn handle_command(&mut self, cmd: &str) -> bool {
        let mut words = cmd.splitn(3, char::is_whitespace);
        let head = words.next().unwrap_or_default();
        match head {
            ":quit" | ":q" | ":exit" => {
                println!("Goodbye!");
                true
            }
            ":help" | ":h" | ":?" => {
                self.print_help();
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            ":set" => {
                match (words.next(), words.next()) {
                    (Some(name), Some(value)) => self.variables.set(name, host_value(value)),
                    _ => println!("Usage: :set <name> <value>"),
                }
                false
            }
            ":unset" => {
                match words.next() {
                    Some(name) => {
                        if self.variables.remove(name).is_none() {
                            println!("Variable {name} is undefined.");
                        }
                    }
                    None => println!("Usage: :unset <name>"),
                }
                false
            }
            ":vars" => {
                for name in self.variables.names() {
                    if let Some(value) = self.variables.get(&name) {
                        println!("  {name} = {value} ({})", value.type_name());
                    }
                }
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn print_help(&self) {
        println!("SEL REPL Commands:");
        println!("  :help, :h, :?        Show this help");
        println!("  :quit, :q            Exit the REPL");
        println!("  :clear               Clear the screen");
        println!("  :set <name> <value>  Bind a host variable");
        println!("  :unset <name>        Remove a host variable");
        println!("  :vars                List host variables");
        println!();
        println!("Input without `${{` is evaluated as one expression:");
        println!("  1 + 2 * 3");
        println!("  Name.Size > 3 ? 'long' : 'short'");
        println!("Templates mix text and blocks:");
        println!("  Hello ${{ name }}!");
    }

    fn context(&self) -> ContextRef {
        match &self.element {
            Some(element) => element.context_with(Rc::clone(&self.variables)),
            None => Rc::clone(&self.variables) as ContextRef,
        }
    }

    /// Evaluate one line and render its value or error
    fn eval_line(&self, input: &str) -> String {
        let source = if input.contains("${") {
            input.to_string()
        } else {
            format!("${{ {input} }}")
        };
        match self.engine.evaluate(&source, &self.context()) {
            Ok(result) => render(&result),
            Err(e) => format!("{e}"),
        }
    }
}

/// Value, or the status when the result failed
pub fn render(result: &FunctionResult) -> String {
    let outcome = result.outcome();
    if outcome.status.is_ok() {
        format!("{} : {}", outcome.value, outcome.value.type_name())
    } else {
        format!("{}: {}", outcome.status.severity, outcome.status.message)
    }
}

/// Read a host variable from text: `null`, booleans, numbers, quoted or
/// bare strings. Integers that fit 64 bits are narrow.
pub fn host_value(text: &str) -> Value {
    let text = text.trim();
    if text == "null" {
        return Value::Null;
    }
    if let Ok(b) = text.parse::<bool>() {
        return Value::Boolean(b);
    }
    if let Ok(n) = text.parse::<i64>() {
        return Value::Integer(n);
    }
    if let Some(number) = Number::parse(text) {
        return number.into();
    }
    for quote in ['\'', '"'] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Value::from(inner);
        }
    }
    Value::from(text)
}

/// Get home directory
fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementTypeBuilder, PropertyBuilder, SchemaBuilder, ValueType};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn repl() -> Repl {
        Repl::new(Engine::new()).unwrap()
    }

    #[test]
    fn test_handle_command_quit() {
        let mut repl = repl();
        assert!(repl.handle_command(":quit"));
        assert!(repl.handle_command(":q"));
        assert!(repl.handle_command(":exit"));
    }

    #[test]
    fn test_non_quit_commands_continue() {
        let mut repl = repl();
        assert!(!repl.handle_command(":help"));
        assert!(!repl.handle_command(":clear"));
        assert!(!repl.handle_command(":vars"));
        assert!(!repl.handle_command(":set"));
        assert!(!repl.handle_command(":anything_else"));
    }

    #[test]
    fn test_set_and_unset() {
        let mut repl = repl();
        repl.handle_command(":set greeting 'hello world'");
        assert_eq!(
            repl.variables().get("greeting"),
            Some(Value::from("hello world"))
        );
        repl.handle_command(":unset greeting");
        assert_eq!(repl.variables().get("greeting"), None);
    }

    #[test]
    fn test_eval_line_expression() {
        let repl = repl();
        assert_eq!(repl.eval_line("1 + 2"), "3 : BigInteger");
        assert_eq!(repl.eval_line("1 / 0"), "error: Division by zero.");
    }

    #[test]
    fn test_eval_line_uses_variables() {
        let mut repl = repl();
        repl.handle_command(":set n 4");
        assert_eq!(repl.eval_line("Hello ${ n * 2 }!"), "Hello 8! : String");
    }

    #[test]
    fn test_eval_line_reports_compile_errors() {
        let repl = repl();
        assert!(repl.eval_line("Frobnicate(1)").contains("Function Frobnicate is undefined."));
    }

    #[test]
    fn test_eval_line_against_element() {
        let schema = SchemaBuilder::new()
            .element_type(
                ElementTypeBuilder::new("City")
                    .property(PropertyBuilder::value("Name", ValueType::String)),
            )
            .build()
            .unwrap();
        let city = schema.instantiate("City").unwrap();
        city.write("Name", Some("Lund")).unwrap();
        let repl = repl().with_element(city.clone());
        assert_eq!(repl.eval_line("Name.ToUpperCase"), "LUND : String");
        city.dispose();
    }

    #[test]
    fn test_host_value() {
        assert_eq!(host_value("null"), Value::Null);
        assert_eq!(host_value("true"), Value::Boolean(true));
        assert_eq!(host_value("42"), Value::Integer(42));
        assert_eq!(
            host_value("2.50"),
            Value::Decimal(BigDecimal::from_str("2.50").unwrap())
        );
        assert_eq!(host_value("'7'"), Value::from("7"));
        assert_eq!(host_value("plain"), Value::from("plain"));
    }

    #[test]
    fn test_constants() {
        assert_eq!(PROMPT, "sel> ");
        assert_eq!(HISTORY_FILE, ".sel_history");
    }
}
