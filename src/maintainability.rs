// src/maintainability.rs

//! Delta-maintainability of a commit.
//!
//! Each function ("unit") of a changed source file is rated low or high risk
//! on three properties: size, cyclomatic complexity and number of
//! parameters. A commit scores the share of its changed lines that moved
//! towards low risk, per property, in `[0, 1]`.

use crate::model::DeltaMaintainability;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, trace};
use tree_sitter::{Language, Node, Parser};

pub const LOW_RISK_UNIT_SIZE: usize = 15;
pub const LOW_RISK_COMPLEXITY: usize = 5;
pub const LOW_RISK_PARAMETERS: usize = 2;

/// Name given to lambdas and other units without one
const ANONYMOUS: &str = "(anonymous)";

/// Parameter-list entries that are not declared parameters
const IGNORED_PARAMETER_KINDS: [&str; 5] = [
    "self_parameter",
    "attribute_item",
    "receiver_parameter",
    "keyword_separator",
    "positional_separator",
];

/// Languages whose units can be rated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Rust,
    C,
    Cpp,
    CSharp,
    Java,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Python,
}

impl SourceLanguage {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let language = match ext.as_str() {
            "rs" => Self::Rust,
            "c" | "h" => Self::C,
            "cc" | "cpp" | "cxx" | "hh" | "hpp" | "hxx" => Self::Cpp,
            "cs" => Self::CSharp,
            "java" => Self::Java,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "mts" | "cts" => Self::TypeScript,
            "tsx" => Self::Tsx,
            "go" => Self::Go,
            "py" | "pyi" => Self::Python,
            _ => return None,
        };
        Some(language)
    }

    fn grammar(self) -> Language {
        match self {
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::C => tree_sitter_c::LANGUAGE.into(),
            Self::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Self::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// Node kinds that define a function
    fn unit_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Rust => &["function_item"],
            Self::C | Self::Cpp => &["function_definition"],
            Self::CSharp => &[
                "method_declaration",
                "constructor_declaration",
                "destructor_declaration",
                "operator_declaration",
                "local_function_statement",
            ],
            Self::Java => &["method_declaration", "constructor_declaration"],
            Self::JavaScript | Self::TypeScript | Self::Tsx => &[
                "function_declaration",
                "generator_function_declaration",
                "function_expression",
                "generator_function",
                "method_definition",
                "arrow_function",
            ],
            Self::Go => &["function_declaration", "method_declaration", "func_literal"],
            Self::Python => &["function_definition"],
        }
    }

    /// Node kinds that add a path through a unit. `&&` and `||` are counted
    /// on binary expressions for every language.
    fn branch_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Rust => &[
                "if_expression",
                "while_expression",
                "for_expression",
                "loop_expression",
                "match_arm",
            ],
            Self::C => &[
                "if_statement",
                "while_statement",
                "for_statement",
                "do_statement",
                "case_statement",
                "conditional_expression",
            ],
            Self::Cpp => &[
                "if_statement",
                "while_statement",
                "for_statement",
                "for_range_loop",
                "do_statement",
                "case_statement",
                "catch_clause",
                "conditional_expression",
            ],
            Self::CSharp => &[
                "if_statement",
                "while_statement",
                "for_statement",
                "foreach_statement",
                "do_statement",
                "switch_section",
                "catch_clause",
                "conditional_expression",
            ],
            Self::Java => &[
                "if_statement",
                "while_statement",
                "for_statement",
                "enhanced_for_statement",
                "do_statement",
                "switch_label",
                "catch_clause",
                "ternary_expression",
            ],
            Self::JavaScript | Self::TypeScript | Self::Tsx => &[
                "if_statement",
                "while_statement",
                "for_statement",
                "for_in_statement",
                "do_statement",
                "switch_case",
                "catch_clause",
                "ternary_expression",
            ],
            Self::Go => &[
                "if_statement",
                "for_statement",
                "expression_case",
                "type_case",
                "communication_case",
            ],
            Self::Python => &[
                "if_statement",
                "elif_clause",
                "while_statement",
                "for_statement",
                "except_clause",
                "conditional_expression",
                "if_clause",
                "case_clause",
                "boolean_operator",
            ],
        }
    }
}

/// Metrics of one function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMetrics {
    pub name: String,
    pub nloc: usize,
    pub complexity: usize,
    pub parameters: usize,
}

/// Lines of code in low-risk and high-risk units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskProfile {
    pub low: usize,
    pub high: usize,
}

impl RiskProfile {
    fn add(&mut self, nloc: usize, low_risk: bool) {
        if low_risk {
            self.low += nloc;
        } else {
            self.high += nloc;
        }
    }
}

/// Risk profiles of a whole file, one per property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileProfile {
    pub size: RiskProfile,
    pub complexity: RiskProfile,
    pub interfacing: RiskProfile,
}

impl FileProfile {
    pub fn of_source(language: SourceLanguage, source: &str) -> Self {
        let mut profile = Self::default();
        for unit in extract_units(language, source) {
            trace!(
                unit = %unit.name,
                nloc = unit.nloc,
                complexity = unit.complexity,
                parameters = unit.parameters,
                "Rated unit"
            );
            profile.size.add(unit.nloc, unit.nloc <= LOW_RISK_UNIT_SIZE);
            profile
                .complexity
                .add(unit.nloc, unit.complexity <= LOW_RISK_COMPLEXITY);
            profile
                .interfacing
                .add(unit.nloc, unit.parameters <= LOW_RISK_PARAMETERS);
        }
        profile
    }
}

/// Signed change of a risk profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Delta {
    low: i64,
    high: i64,
}

impl Delta {
    fn add(&mut self, old: RiskProfile, new: RiskProfile) {
        self.low += new.low as i64 - old.low as i64;
        self.high += new.high as i64 - old.high as i64;
    }

    fn proportion(self) -> Option<f64> {
        let mut good = 0;
        let mut bad = 0;
        if self.low >= 0 {
            good += self.low;
        } else {
            bad -= self.low;
        }
        if self.high >= 0 {
            bad += self.high;
        } else {
            good -= self.high;
        }
        let total = good + bad;
        (total != 0).then(|| good as f64 / total as f64)
    }
}

/// Collects the per-file deltas of one commit.
///
/// Unchanged units contribute the same lines to the old and the new profile,
/// so diffing whole-file profiles yields the delta of the changed units.
#[derive(Debug, Default)]
pub struct DmmAccumulator {
    size: Delta,
    complexity: Delta,
    interfacing: Delta,
}

impl DmmAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `old` is None for an added file, `new` is None for a deleted one.
    pub fn add_file(&mut self, language: SourceLanguage, old: Option<&str>, new: Option<&str>) {
        let profile = |source| FileProfile::of_source(language, source);
        let old = old.map(profile).unwrap_or_default();
        let new = new.map(profile).unwrap_or_default();
        self.size.add(old.size, new.size);
        self.complexity.add(old.complexity, new.complexity);
        self.interfacing.add(old.interfacing, new.interfacing);
    }

    pub fn finish(self) -> DeltaMaintainability {
        DeltaMaintainability {
            unit_size: self.size.proportion(),
            unit_complexity: self.complexity.proportion(),
            unit_interfacing: self.interfacing.proportion(),
        }
    }
}

/// Splits a source file into its functions and rates each one.
///
/// Every function definition of the grammar is a unit, nested ones included.
/// A nested unit is rated on its own and left out of the enclosing one.
pub fn extract_units(language: SourceLanguage, source: &str) -> Vec<UnitMetrics> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&language.grammar()) {
        debug!("Cannot load the {:?} grammar: {}", language, e);
        return Vec::new();
    }
    let Some(tree) = parser.parse(source, None) else {
        debug!("Failed to parse {:?} source", language);
        return Vec::new();
    };

    let mut units = Vec::new();
    collect_units(tree.root_node(), language, source.as_bytes(), &mut units);
    units
}

fn collect_units(node: Node, language: SourceLanguage, source: &[u8], units: &mut Vec<UnitMetrics>) {
    if language.unit_kinds().contains(&node.kind()) {
        units.push(rate_unit(node, language, source));
    }
    for child in node.children(&mut node.walk()) {
        collect_units(child, language, source, units);
    }
}

fn rate_unit(unit: Node, language: SourceLanguage, source: &[u8]) -> UnitMetrics {
    let mut rows = BTreeSet::new();
    let mut complexity = 1;
    walk_body(unit, unit, language, source, &mut rows, &mut complexity);

    UnitMetrics {
        name: unit_name(unit, source),
        nloc: rows.len(),
        complexity,
        parameters: count_parameters(unit, source),
    }
}

/// Collects the rows holding code and counts branches, without entering
/// comments or nested units.
fn walk_body(
    node: Node,
    unit: Node,
    language: SourceLanguage,
    source: &[u8],
    rows: &mut BTreeSet<usize>,
    complexity: &mut usize,
) {
    if node.kind().ends_with("comment") {
        return;
    }
    if node.id() != unit.id() && language.unit_kinds().contains(&node.kind()) {
        return;
    }
    if node.child_count() == 0 {
        // Statement terminators like Go's newline are leaves too
        if source[node.byte_range()].iter().all(u8::is_ascii_whitespace) {
            return;
        }
        let (start, end) = (node.start_position(), node.end_position());
        let last = if end.column == 0 && end.row > start.row {
            end.row - 1
        } else {
            end.row
        };
        rows.extend(start.row..=last);
        return;
    }

    if language.branch_kinds().contains(&node.kind()) {
        *complexity += 1;
    }
    if node.kind() == "binary_expression" {
        for child in node.children(&mut node.walk()) {
            if child.kind() == "&&" || child.kind() == "||" {
                *complexity += 1;
            }
        }
    }

    for child in node.children(&mut node.walk()) {
        walk_body(child, unit, language, source, rows, complexity);
    }
}

fn unit_name(unit: Node, source: &[u8]) -> String {
    let name = unit
        .child_by_field_name("name")
        .or_else(|| function_declarator(unit).and_then(|d| d.child_by_field_name("declarator")));
    name.and_then(|n| n.utf8_text(source).ok())
        .unwrap_or(ANONYMOUS)
        .to_string()
}

/// The `name(params)` part of a C or C++ definition, under any pointer or
/// reference declarators
fn function_declarator(unit: Node) -> Option<Node> {
    let mut declarator = unit.child_by_field_name("declarator")?;
    while declarator.kind() != "function_declarator" {
        declarator = declarator.child_by_field_name("declarator").or_else(|| {
            // reference_declarator has no field for its inner declarator
            declarator.named_child(0)
        })?;
    }
    Some(declarator)
}

fn count_parameters(unit: Node, source: &[u8]) -> usize {
    // `x => x` has a single bare parameter
    if unit.child_by_field_name("parameter").is_some() {
        return 1;
    }
    let Some(params) = unit
        .child_by_field_name("parameters")
        .or_else(|| function_declarator(unit).and_then(|d| d.child_by_field_name("parameters")))
    else {
        return 0;
    };

    let mut cursor = params.walk();
    let count = params
        .named_children(&mut cursor)
        .filter(|p| !p.kind().ends_with("comment") && !IGNORED_PARAMETER_KINDS.contains(&p.kind()))
        .filter(|p| !is_void_list(*p, source))
        .map(|p| {
            // Go declares `a, b int` in one node
            p.children_by_field_name("name", &mut p.walk()).count().max(1)
        })
        .sum();
    count
}

/// `(void)` in C declares no parameters
fn is_void_list(param: Node, source: &[u8]) -> bool {
    param.kind() == "parameter_declaration"
        && param.child_by_field_name("declarator").is_none()
        && param.utf8_text(source).is_ok_and(|t| t.trim() == "void")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_RUST: &str = r#"
use std::fmt;

/// Adds numbers
fn add(a: i32, b: i32) -> i32 {
    a + b
}

impl Thing {
    pub fn check(&self, x: u32) -> bool {
        // a comment with { braces }
        if x > 3 && x < 10 {
            return true;
        }
        let s = "not a } brace";
        false
    }
}
"#;

    fn units(language: SourceLanguage, source: &str) -> Vec<UnitMetrics> {
        extract_units(language, source)
    }

    #[test]
    fn test_extract_rust_units() {
        let units = units(SourceLanguage::Rust, SMALL_RUST);
        assert_eq!(units.len(), 2);

        assert_eq!(units[0].name, "add");
        assert_eq!(units[0].parameters, 2);
        assert_eq!(units[0].complexity, 1);
        assert_eq!(units[0].nloc, 3);

        assert_eq!(units[1].name, "check");
        assert_eq!(units[1].parameters, 1);
        assert_eq!(units[1].complexity, 3);
        assert_eq!(units[1].nloc, 7);
    }

    #[test]
    fn test_char_literals_do_not_confuse_units() {
        let src = "fn open(c: char) -> bool {\n    if c == '{' {\n        return true;\n    }\n    false\n}\n\nfn two(a: u8) -> u8 {\n    a\n}\n";
        let units = units(SourceLanguage::Rust, src);
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["open", "two"]);
        assert_eq!(units[0].complexity, 2);
        assert_eq!(units[0].nloc, 6);
    }

    #[test]
    fn test_multiline_header_and_control_blocks() {
        let src = "class Job {\n    public int run(\n        int a,\n        Map<String, Integer> b,\n        int c)\n    {\n        while (a > 0) {\n            a--;\n        }\n        return a;\n    }\n}\n";
        let units = units(SourceLanguage::Java, src);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "run");
        assert_eq!(units[0].parameters, 3);
        assert_eq!(units[0].complexity, 2);
        assert_eq!(units[0].nloc, 10);
    }

    #[test]
    fn test_go_receiver_is_not_a_parameter() {
        let src = "package main\n\nfunc (s *Server) Handle(a int, b int, c int) error {\n\tif a > b || c > 0 {\n\t\treturn nil\n\t}\n\n\treturn nil\n}\n\nfunc add(a, b int) int {\n\treturn a + b\n}\n";
        let units = units(SourceLanguage::Go, src);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, "Handle");
        assert_eq!(units[0].parameters, 3);
        assert_eq!(units[0].complexity, 3);
        assert_eq!(units[0].nloc, 6);
        assert_eq!(units[1].name, "add");
        assert_eq!(units[1].parameters, 2);
    }

    #[test]
    fn test_python_units() {
        let src = "class Greeter:\n    def greet(self, name, *, loud=False):\n        # shout maybe\n        if loud and name:\n            return name.upper()\n        return name\n";
        let units = units(SourceLanguage::Python, src);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "greet");
        assert_eq!(units[0].parameters, 3);
        assert_eq!(units[0].complexity, 3);
        assert_eq!(units[0].nloc, 4);
    }

    #[test]
    fn test_c_declarators() {
        let src = "int main(void) {\n    return 0;\n}\n\nstatic char *dup(const char *s, size_t n) {\n    return s;\n}\n";
        let units = units(SourceLanguage::C, src);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, "main");
        assert_eq!(units[0].parameters, 0);
        assert_eq!(units[1].name, "dup");
        assert_eq!(units[1].parameters, 2);
    }

    #[test]
    fn test_nested_units_are_rated_apart() {
        let src = "function outer(items) {\n  return items.map((x) => {\n    if (x) {\n      return 1;\n    }\n    return 0;\n  });\n}\n";
        let units = units(SourceLanguage::JavaScript, src);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, "outer");
        assert_eq!(units[0].complexity, 1);
        assert_eq!(units[1].name, ANONYMOUS);
        assert_eq!(units[1].parameters, 1);
        assert_eq!(units[1].complexity, 2);
    }

    #[test]
    fn test_types_and_closures_are_not_units() {
        let src = "#[derive(Debug)]\nstruct S {\n    a: u8,\n}\n\nconst F: fn(u8) -> u8 = |x| {\n    x\n};\n";
        assert!(units(SourceLanguage::Rust, src).is_empty());
    }

    #[test]
    fn test_supported_extensions() {
        let language = |p: &str| SourceLanguage::from_path(Path::new(p));
        assert_eq!(language("src/lib.rs"), Some(SourceLanguage::Rust));
        assert_eq!(language("App.JAVA"), Some(SourceLanguage::Java));
        assert_eq!(language("app.py"), Some(SourceLanguage::Python));
        assert_eq!(language("view.tsx"), Some(SourceLanguage::Tsx));
        assert_eq!(language("README.md"), None);
        assert_eq!(language("Makefile"), None);
    }

    #[test]
    fn test_delta_proportion() {
        assert_eq!(Delta { low: 0, high: 0 }.proportion(), None);
        assert_eq!(Delta { low: 10, high: 0 }.proportion(), Some(1.0));
        assert_eq!(Delta { low: 0, high: 10 }.proportion(), Some(0.0));
        assert_eq!(Delta { low: 6, high: -2 }.proportion(), Some(1.0));
        assert_eq!(Delta { low: -4, high: 4 }.proportion(), Some(0.0));
        assert_eq!(Delta { low: 3, high: 1 }.proportion(), Some(0.75));
    }

    #[test]
    fn test_accumulator_rates_added_small_function_as_good() {
        let mut acc = DmmAccumulator::new();
        acc.add_file(SourceLanguage::Rust, None, Some("fn f() {\n    1\n}\n"));
        let dmm = acc.finish();
        assert_eq!(dmm.unit_size, Some(1.0));
        assert_eq!(dmm.unit_complexity, Some(1.0));
        assert_eq!(dmm.unit_interfacing, Some(1.0));
    }

    #[test]
    fn test_accumulator_rates_growing_interface_as_bad() {
        let mut acc = DmmAccumulator::new();
        acc.add_file(
            SourceLanguage::Python,
            Some("def f(a):\n    return a\n"),
            Some("def f(a, b, c):\n    return a\n"),
        );
        let dmm = acc.finish();
        assert_eq!(dmm.unit_interfacing, Some(0.0));
        assert_eq!(dmm.unit_size, None);
    }

    #[test]
    fn test_accumulator_without_units_is_absent() {
        let mut acc = DmmAccumulator::new();
        acc.add_file(
            SourceLanguage::Rust,
            Some("const X: u8 = 1;\n"),
            Some("const X: u8 = 2;\n"),
        );
        assert_eq!(acc.finish(), DeltaMaintainability::default());
    }
}
