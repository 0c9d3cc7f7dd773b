use regex::Regex;

#[derive(Debug, Clone)]
pub struct MutationOperator {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: String,
}

impl MutationOperator {
    pub fn new(name: &'static str, pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        Ok(MutationOperator {
            name,
            pattern: Regex::new(pattern)?,
            replacement: replacement.to_string(),
        })
    }

    /// Applies the operator to the first match in `line`, if any.
    pub fn apply(&self, line: &str) -> Option<String> {
        if !self.pattern.is_match(line) {
            return None;
        }
        let mutated = self.pattern.replace(line, self.replacement.as_str());
        if mutated == line {
            None
        } else {
            Some(mutated.into_owned())
        }
    }
}

/// Operator table for Java and C-family sources, grouped the usual way:
/// relational (ROR), conditional (COR), arithmetic (AOR), unary (UOI),
/// literal replacement and statement deletion.
pub fn get_regex_operators() -> Result<Vec<MutationOperator>, regex::Error> {
    let operators = vec![
        ("ROR", r" > ", " < "),
        ("ROR", r" > ", " >= "),
        ("ROR", r" > ", " <= "),
        ("ROR", r" < ", " > "),
        ("ROR", r" < ", " <= "),
        ("ROR", r" < ", " >= "),
        ("ROR", r" >= ", " <= "),
        ("ROR", r" >= ", " > "),
        ("ROR", r" <= ", " >= "),
        ("ROR", r" <= ", " < "),
        ("ROR", r" == ", " != "),
        ("ROR", r" != ", " == "),
        ("COR", r"&&", "||"),
        ("COR", r"\|\|", "&&"),
        ("AOR", r" - ", " + "),
        ("AOR", r" \+ ", " - "),
        ("AOR", r" \+ ", " * "),
        ("AOR", r" \* ", " / "),
        ("AOR", r" / ", " * "),
        ("AOR", r" % ", " * "),
        ("UOI", r"--(\b\w+\b)", r"++$1"),
        ("UOI", r"(\b\w+\b)--", r"$1++"),
        ("UOI", r"\+\+(\b\w+\b)", r"--$1"),
        ("UOI", r"(\b\w+\b)\+\+", r"$1--"),
        ("LVR", r"\btrue\b", "false"),
        ("LVR", r"\bfalse\b", "true"),
        ("LVR", r"\((-?\d+)\)", r"($1 + 1)"),
        ("LVR", r"\((-?\d+)\)", r"($1 - 1)"),
        ("JMP", r"\bcontinue\b", "break"),
        ("JMP", r"\bbreak\b", "continue"),
        ("CND", r"\b(if|while)\s*\(([^()]*)\)", r"$1 (true)"),
        ("CND", r"\b(if|while)\s*\(([^()]*)\)", r"$1 (false)"),
        ("SDL", r"^(\s*)[a-zA-Z_][\w.]*\s*\([^;]*\)\s*;\s*$", "$1;"),
    ];

    operators
        .into_iter()
        .map(|(name, pattern, replacement)| MutationOperator::new(name, pattern, replacement))
        .collect()
}

pub fn get_do_not_mutate_patterns() -> Vec<&'static str> {
    vec![
        "//", "/*", "*", "#", "import ", "package ", "@", "System.out", "System.err", "assert",
    ]
}

pub fn get_skip_if_contain_patterns() -> Vec<&'static str> {
    vec!["serialVersionUID", "printf("]
}

pub fn should_skip_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return true;
    }

    if get_do_not_mutate_patterns()
        .iter()
        .any(|pattern| trimmed.starts_with(pattern))
    {
        return true;
    }

    get_skip_if_contain_patterns()
        .iter()
        .any(|pattern| line.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operators_compile() {
        let operators = get_regex_operators().unwrap();
        assert!(operators.len() > 20);
    }

    #[test]
    fn test_apply_relational_operator() {
        let op = MutationOperator::new("ROR", r" < ", " <= ").unwrap();
        assert_eq!(
            op.apply("for (int i = 0; i < n; i++) {"),
            Some("for (int i = 0; i <= n; i++) {".to_string())
        );
        assert_eq!(op.apply("return a + b;"), None);
    }

    #[test]
    fn test_statement_deletion_keeps_indentation() {
        let operators = get_regex_operators().unwrap();
        let sdl = operators.iter().find(|op| op.name == "SDL").unwrap();
        assert_eq!(sdl.apply("        list.clear();"), Some("        ;".to_string()));
        assert_eq!(sdl.apply("        int x = compute();"), None);
    }

    #[test]
    fn test_should_skip_line() {
        assert!(should_skip_line("// a comment"));
        assert!(should_skip_line("   * javadoc body"));
        assert!(should_skip_line("import java.util.List;"));
        assert!(should_skip_line("    System.out.println(x);"));
        assert!(should_skip_line("   "));

        assert!(!should_skip_line("int x = a + b;"));
        assert!(!should_skip_line("    return value;"));
    }
}
