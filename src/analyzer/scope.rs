//! Lexical scope model
//!
//! One walk over the tree collects scopes, declarations and unresolved
//! references; references are resolved afterwards against the scope chain,
//! so hoisted functions and `var`s resolve regardless of source order.

use tree_sitter::Node;

use crate::syntax::query::{get_node_text, is_capitalized, named_children};
use crate::syntax::{Span, SyntaxTree};

pub type ScopeId = usize;
pub type DeclId = usize;

/// The module scope is always the first one
pub const MODULE_SCOPE: ScopeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub span: Span,
    pub declarations: Vec<DeclId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Import,
    Function,
    Class,
    Const,
    Let,
    Var,
    Param,
    CatchParam,
    Type,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub scope: ScopeId,
    pub name_span: Span,
    /// The statement (or parameter) that introduces the binding
    pub statement: Span,
    /// `variable_declarator` range for let/const/var bindings
    pub declarator: Option<Span>,
    /// Number of declarators in the declaring statement
    pub sibling_declarators: usize,
    /// Declared through `{ name }` destructuring
    pub shorthand: bool,
    pub exported: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Plain,
    /// `{ name }` object literal shorthand
    Shorthand,
    /// `export { name }`
    ExportSpecifier,
    /// `export default name`
    ExportDefault,
    /// `<Name />` and `</Name>`
    JsxName,
    /// Type position (`type_identifier`)
    Type,
}

#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    pub span: Span,
    pub scope: ScopeId,
    pub decl: Option<DeclId>,
    pub is_write: bool,
    pub kind: RefKind,
    /// `name.member` when the reference is the object of a member access
    pub member: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeModel {
    pub scopes: Vec<Scope>,
    pub declarations: Vec<Declaration>,
    pub references: Vec<Reference>,
}

impl ScopeModel {
    pub fn build(tree: &SyntaxTree) -> Self {
        let root = tree.root();
        let mut builder = Builder {
            source: tree.source(),
            model: ScopeModel::default(),
        };
        builder.model.scopes.push(Scope {
            kind: ScopeKind::Module,
            parent: None,
            span: Span::from_node(&root),
            declarations: Vec::new(),
        });
        builder.walk_children(&root, MODULE_SCOPE);

        let mut model = builder.model;
        model.resolve();
        model
    }

    fn resolve(&mut self) {
        for i in 0..self.references.len() {
            let decl = self.lookup(&self.references[i].name, self.references[i].scope);
            self.references[i].decl = decl;
            if let Some(id) = decl {
                if matches!(
                    self.references[i].kind,
                    RefKind::ExportSpecifier | RefKind::ExportDefault
                ) {
                    self.declarations[id].exported = true;
                }
            }
        }
    }

    /// Resolve a name from a scope outward
    pub fn lookup(&self, name: &str, from: ScopeId) -> Option<DeclId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = &self.scopes[id];
            if let Some(decl) = scope
                .declarations
                .iter()
                .copied()
                .find(|d| self.declarations[*d].name == name)
            {
                return Some(decl);
            }
            current = scope.parent;
        }
        None
    }

    /// Innermost scope containing a byte offset
    pub fn scope_at(&self, offset: usize) -> ScopeId {
        let mut best = MODULE_SCOPE;
        for (id, scope) in self.scopes.iter().enumerate() {
            if scope.span.start <= offset
                && offset < scope.span.end
                && scope.span.len() <= self.scopes[best].span.len()
            {
                best = id;
            }
        }
        best
    }

    /// Scope chain from `from` up to the module scope, inclusive
    pub fn chain(&self, from: ScopeId) -> Vec<ScopeId> {
        let mut out = Vec::new();
        let mut current = Some(from);
        while let Some(id) = current {
            out.push(id);
            current = self.scopes[id].parent;
        }
        out
    }

    /// Whether `ancestor` is `scope` or one of its parents
    pub fn is_within(&self, scope: ScopeId, ancestor: ScopeId) -> bool {
        self.chain(scope).contains(&ancestor)
    }

    /// Declaration whose name, or one of whose references, covers `offset`
    pub fn declaration_at(&self, offset: usize) -> Option<DeclId> {
        if let Some(id) = self
            .declarations
            .iter()
            .position(|d| d.name_span.start <= offset && offset <= d.name_span.end)
        {
            return Some(id);
        }
        self.references
            .iter()
            .find(|r| r.span.start <= offset && offset <= r.span.end)
            .and_then(|r| r.decl)
    }

    pub fn references_to(&self, decl: DeclId) -> impl Iterator<Item = &Reference> {
        self.references.iter().filter(move |r| r.decl == Some(decl))
    }

    /// Declarations living directly in the module scope
    pub fn top_level(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.declarations
            .iter()
            .enumerate()
            .filter(|(_, d)| d.scope == MODULE_SCOPE)
    }

    pub fn declared_in(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.scopes[scope]
            .declarations
            .iter()
            .copied()
            .find(|d| self.declarations[*d].name == name)
    }
}

/// Per-statement facts handed down while declaring patterns
#[derive(Clone, Copy)]
struct DeclSite {
    kind: DeclKind,
    scope: ScopeId,
    statement: Span,
    declarator: Option<Span>,
    siblings: usize,
    exported: bool,
}

struct Builder<'s> {
    source: &'s str,
    model: ScopeModel,
}

impl<'s> Builder<'s> {
    fn new_scope(&mut self, kind: ScopeKind, parent: ScopeId, node: &Node) -> ScopeId {
        self.model.scopes.push(Scope {
            kind,
            parent: Some(parent),
            span: Span::from_node(node),
            declarations: Vec::new(),
        });
        self.model.scopes.len() - 1
    }

    /// Nearest function or module scope, where `var` lands
    fn hoist_target(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        loop {
            let s = &self.model.scopes[current];
            if s.kind != ScopeKind::Block {
                return current;
            }
            match s.parent {
                Some(p) => current = p,
                None => return current,
            }
        }
    }

    fn declare(&mut self, name_node: &Node, site: DeclSite, shorthand: bool) {
        let name = get_node_text(name_node, self.source);
        if name.is_empty() {
            return;
        }
        let scope = if site.kind == DeclKind::Var {
            self.hoist_target(site.scope)
        } else {
            site.scope
        };
        self.model.declarations.push(Declaration {
            name,
            kind: site.kind,
            scope,
            name_span: Span::from_node(name_node),
            statement: site.statement,
            declarator: site.declarator,
            sibling_declarators: site.siblings,
            shorthand,
            exported: site.exported,
        });
        let id = self.model.declarations.len() - 1;
        self.model.scopes[scope].declarations.push(id);
    }

    fn reference(&mut self, node: &Node, scope: ScopeId, kind: RefKind, is_write: bool) {
        let member = node.parent().and_then(|p| match p.kind() {
            "member_expression" if p.child_by_field_name("object").map(|o| o.id()) == Some(node.id()) => p
                .child_by_field_name("property")
                .map(|prop| get_node_text(&prop, self.source)),
            "nested_type_identifier" => p
                .child_by_field_name("name")
                .map(|n| get_node_text(&n, self.source)),
            _ => None,
        });
        self.model.references.push(Reference {
            name: get_node_text(node, self.source),
            span: Span::from_node(node),
            scope,
            decl: None,
            is_write,
            kind,
            member,
        });
    }

    fn walk_children(&mut self, node: &Node, scope: ScopeId) {
        for child in named_children(node) {
            self.walk(&child, scope);
        }
    }

    fn walk(&mut self, node: &Node, scope: ScopeId) {
        match node.kind() {
            "identifier" => self.reference(node, scope, RefKind::Plain, false),
            "shorthand_property_identifier" => self.reference(node, scope, RefKind::Shorthand, false),
            "type_identifier" => self.reference(node, scope, RefKind::Type, false),
            "comment" | "property_identifier" | "statement_identifier" | "string" | "number" => {}

            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let site = self.statement_site(node, DeclKind::Function, scope);
                    self.declare(&name, site, false);
                }
                self.walk_function(node, scope);
            }
            "function_expression" | "generator_function" | "arrow_function"
            | "method_definition" => self.walk_function(node, scope),

            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let site = self.statement_site(node, DeclKind::Class, scope);
                    self.declare(&name, site, false);
                }
                for child in named_children(node) {
                    if Some(child.id()) != node.child_by_field_name("name").map(|n| n.id()) {
                        self.walk(&child, scope);
                    }
                }
            }
            "interface_declaration" | "type_alias_declaration" | "enum_declaration" => {
                let name = node.child_by_field_name("name");
                if let Some(name) = name {
                    let site = self.statement_site(node, DeclKind::Type, scope);
                    self.declare(&name, site, false);
                }
                for child in named_children(node) {
                    if Some(child.id()) != name.map(|n| n.id()) {
                        self.walk(&child, scope);
                    }
                }
            }
            "type_parameter" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let span = Span::from_node(node);
                    let site = DeclSite {
                        kind: DeclKind::Type,
                        scope,
                        statement: span,
                        declarator: None,
                        siblings: 1,
                        exported: false,
                    };
                    self.declare(&name, site, false);
                }
            }

            "statement_block" | "switch_body" | "class_body" => {
                let block = self.new_scope(ScopeKind::Block, scope, node);
                self.walk_children(node, block);
            }
            "for_statement" => {
                let block = self.new_scope(ScopeKind::Block, scope, node);
                self.walk_children(node, block);
            }
            "for_in_statement" => {
                let block = self.new_scope(ScopeKind::Block, scope, node);
                let left = node.child_by_field_name("left");
                if let Some(left) = left {
                    match node.child_by_field_name("kind").map(|k| get_node_text(&k, self.source)) {
                        Some(kind) => {
                            let site = DeclSite {
                                kind: decl_kind_for(&kind),
                                scope: block,
                                statement: Span::from_node(node),
                                declarator: None,
                                siblings: 1,
                                exported: false,
                            };
                            self.declare_pattern(&left, site, block);
                        }
                        None => self.walk_write_target(&left, block),
                    }
                }
                for child in named_children(node) {
                    if Some(child.id()) != left.map(|l| l.id()) {
                        self.walk(&child, block);
                    }
                }
            }
            "catch_clause" => {
                let block = self.new_scope(ScopeKind::Block, scope, node);
                if let Some(param) = node.child_by_field_name("parameter") {
                    let site = DeclSite {
                        kind: DeclKind::CatchParam,
                        scope: block,
                        statement: Span::from_node(&param),
                        declarator: None,
                        siblings: 1,
                        exported: false,
                    };
                    self.declare_pattern(&param, site, block);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk(&body, block);
                }
            }

            "lexical_declaration" | "variable_declaration" => self.walk_variable_declaration(node, scope),
            "import_statement" => self.declare_imports(node),
            "export_statement" => {
                if node.child_by_field_name("source").is_some() {
                    return;
                }
                if let Some(value) = node.child_by_field_name("value") {
                    if value.kind() == "identifier" {
                        self.reference(&value, scope, RefKind::ExportDefault, false);
                        return;
                    }
                }
                self.walk_children(node, scope);
            }
            "export_specifier" => {
                if let Some(name) = node.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        self.reference(&name, scope, RefKind::ExportSpecifier, false);
                    }
                }
            }

            "jsx_opening_element" | "jsx_closing_element" | "jsx_self_closing_element" => {
                let name = node.child_by_field_name("name");
                if let Some(name) = name {
                    if name.kind() == "identifier" {
                        if is_capitalized(&get_node_text(&name, self.source)) {
                            self.reference(&name, scope, RefKind::JsxName, false);
                        }
                    } else {
                        self.walk(&name, scope);
                    }
                }
                for child in named_children(node) {
                    if Some(child.id()) != name.map(|n| n.id()) {
                        self.walk(&child, scope);
                    }
                }
            }

            "assignment_expression" | "augmented_assignment_expression" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.walk_write_target(&left, scope);
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.walk(&right, scope);
                }
            }
            "update_expression" => {
                if let Some(arg) = node.child_by_field_name("argument") {
                    self.walk_write_target(&arg, scope);
                }
            }
            _ => self.walk_children(node, scope),
        }
    }

    /// Assignment targets: bare identifiers and destructuring patterns are writes
    fn walk_write_target(&mut self, node: &Node, scope: ScopeId) {
        match node.kind() {
            "identifier" => self.reference(node, scope, RefKind::Plain, true),
            "shorthand_property_identifier_pattern" => self.reference(node, scope, RefKind::Shorthand, true),
            "object_pattern" | "array_pattern" | "pair_pattern" | "rest_pattern"
            | "object_assignment_pattern" | "assignment_pattern" | "parenthesized_expression" => {
                for child in named_children(node) {
                    if child.kind() == "property_identifier" {
                        continue;
                    }
                    if node.kind().ends_with("assignment_pattern")
                        && node.child_by_field_name("right").map(|r| r.id()) == Some(child.id())
                    {
                        self.walk(&child, scope);
                    } else {
                        self.walk_write_target(&child, scope);
                    }
                }
            }
            _ => self.walk(node, scope),
        }
    }

    fn walk_function(&mut self, node: &Node, scope: ScopeId) {
        let fn_scope = self.new_scope(ScopeKind::Function, scope, node);

        // Named function expressions see their own name
        if matches!(node.kind(), "function_expression" | "generator_function") {
            if let Some(name) = node.child_by_field_name("name") {
                let site = DeclSite {
                    kind: DeclKind::Function,
                    scope: fn_scope,
                    statement: Span::from_node(node),
                    declarator: None,
                    siblings: 1,
                    exported: false,
                };
                self.declare(&name, site, false);
            }
        }

        if let Some(params) = node.child_by_field_name("parameters") {
            self.declare_parameters(&params, fn_scope);
        } else if let Some(param) = node.child_by_field_name("parameter") {
            let site = self.param_site(&param, fn_scope);
            self.declare_pattern(&param, site, fn_scope);
        }

        for field in ["type_parameters", "return_type"] {
            if let Some(child) = node.child_by_field_name(field) {
                self.walk(&child, fn_scope);
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            if body.kind() == "statement_block" {
                self.walk_children(&body, fn_scope);
            } else {
                self.walk(&body, fn_scope);
            }
        }
    }

    fn param_site(&self, param: &Node, scope: ScopeId) -> DeclSite {
        DeclSite {
            kind: DeclKind::Param,
            scope,
            statement: Span::from_node(param),
            declarator: None,
            siblings: 1,
            exported: false,
        }
    }

    fn declare_parameters(&mut self, params: &Node, scope: ScopeId) {
        for param in named_children(params) {
            let site = self.param_site(&param, scope);
            match param.kind() {
                "required_parameter" | "optional_parameter" => {
                    if let Some(pattern) = param.child_by_field_name("pattern") {
                        self.declare_pattern(&pattern, site, scope);
                    }
                    for field in ["type", "value"] {
                        if let Some(child) = param.child_by_field_name(field) {
                            self.walk(&child, scope);
                        }
                    }
                }
                "comment" => {}
                _ => self.declare_pattern(&param, site, scope),
            }
        }
    }

    /// Declare every binding introduced by a (possibly destructuring) pattern
    fn declare_pattern(&mut self, pattern: &Node, site: DeclSite, scope: ScopeId) {
        match pattern.kind() {
            "identifier" => self.declare(pattern, site, false),
            "shorthand_property_identifier_pattern" => self.declare(pattern, site, true),
            "object_pattern" | "array_pattern" | "rest_pattern" => {
                for child in named_children(pattern) {
                    self.declare_pattern(&child, site, scope);
                }
            }
            "pair_pattern" => {
                if let Some(value) = pattern.child_by_field_name("value") {
                    self.declare_pattern(&value, site, scope);
                }
                if let Some(key) = pattern.child_by_field_name("key") {
                    if key.kind() == "computed_property_name" {
                        self.walk(&key, scope);
                    }
                }
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = pattern.child_by_field_name("left") {
                    self.declare_pattern(&left, site, scope);
                }
                if let Some(right) = pattern.child_by_field_name("right") {
                    self.walk(&right, scope);
                }
            }
            "this" | "comment" => {}
            _ => self.walk(pattern, scope),
        }
    }

    fn walk_variable_declaration(&mut self, node: &Node, scope: ScopeId) {
        let keyword = if node.kind() == "variable_declaration" {
            "var".to_string()
        } else {
            node.child_by_field_name("kind")
                .map(|k| get_node_text(&k, self.source))
                .unwrap_or_else(|| "let".to_string())
        };
        let kind = decl_kind_for(&keyword);
        let declarators: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "variable_declarator")
            .collect();
        let mut site = self.statement_site(node, kind, scope);
        site.siblings = declarators.len();

        for declarator in &declarators {
            site.declarator = Some(Span::from_node(declarator));
            if let Some(name) = declarator.child_by_field_name("name") {
                self.declare_pattern(&name, site, scope);
            }
            for field in ["type", "value"] {
                if let Some(child) = declarator.child_by_field_name(field) {
                    self.walk(&child, scope);
                }
            }
        }
    }

    fn declare_imports(&mut self, node: &Node) {
        let site = DeclSite {
            kind: DeclKind::Import,
            scope: MODULE_SCOPE,
            statement: Span::from_node(node),
            declarator: None,
            siblings: 1,
            exported: false,
        };
        for child in named_children(node) {
            if child.kind() != "import_clause" {
                continue;
            }
            for inner in named_children(&child) {
                match inner.kind() {
                    "identifier" => self.declare(&inner, site, false),
                    "namespace_import" => {
                        if let Some(id) = named_children(&inner).into_iter().find(|n| n.kind() == "identifier") {
                            self.declare(&id, site, false);
                        }
                    }
                    "named_imports" => {
                        for spec in named_children(&inner) {
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            let local = spec
                                .child_by_field_name("alias")
                                .or_else(|| spec.child_by_field_name("name"));
                            if let Some(local) = local {
                                self.declare(&local, site, false);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Site for a declaration statement, widened to an enclosing `export`
    fn statement_site(&self, node: &Node, kind: DeclKind, scope: ScopeId) -> DeclSite {
        let (statement, exported) = match node.parent() {
            Some(p) if p.kind() == "export_statement" => (Span::from_node(&p), true),
            _ => (Span::from_node(node), false),
        };
        DeclSite {
            kind,
            scope,
            statement,
            declarator: None,
            siblings: 1,
            exported,
        }
    }
}

fn decl_kind_for(keyword: &str) -> DeclKind {
    match keyword {
        "const" => DeclKind::Const,
        "var" => DeclKind::Var,
        _ => DeclKind::Let,
    }
}
