use super::ExportRecord;
use crate::error::{Result, WavectlError};
use crate::types::DeclKind;
use std::path::Path;
use swc_common::sync::Lrc;
use swc_common::{FileName, SourceMap};
use swc_ecma_ast::{
    Decl, DefaultDecl, EsVersion, Expr, ModuleDecl, ModuleExportName, ModuleItem, Pat, Program,
    Stmt,
};
use swc_ecma_parser::{parse_file_as_program, Syntax, TsSyntax};

// ---------------------------------------------------------------------------
// get_declarations()
// ---------------------------------------------------------------------------

/// Parse a TypeScript source file and extract every top-level declaration
/// with its exported flag. Structural — comments and string literals can
/// never produce a record.
pub fn get_declarations(path: &Path) -> Result<Vec<ExportRecord>> {
    if !path.is_file() {
        return Err(WavectlError::FileNotFound(path.display().to_string()));
    }
    let source = std::fs::read_to_string(path)?;
    parse_declarations(&source, &path.display().to_string())
}

/// Parse `source` (labelled `file` in diagnostics) into export records.
pub fn parse_declarations(source: &str, file: &str) -> Result<Vec<ExportRecord>> {
    let source_map = Lrc::new(SourceMap::default());
    let source_file = source_map.new_source_file(Lrc::new(FileName::Anon), source.to_owned());

    let syntax = Syntax::Typescript(TsSyntax {
        tsx: false,
        decorators: false,
        dts: false,
        no_early_errors: true,
        disallow_ambiguous_jsx_like: false,
    });

    let program = parse_file_as_program(&source_file, syntax, EsVersion::Es2022, None, &mut vec![])
        .map_err(|e| WavectlError::Parse {
            file: file.to_string(),
            message: e.kind().msg().to_string(),
        })?;

    let mut collector = Collector::default();
    match &program {
        Program::Module(module) => {
            for item in &module.body {
                collector.module_item(item);
            }
        }
        Program::Script(script) => {
            for stmt in &script.body {
                collector.stmt(stmt);
            }
        }
    }
    Ok(collector.finish())
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Collector {
    records: Vec<ExportRecord>,
    /// Names from local `export { a, b }` lists and `export default ident`,
    /// resolved against collected records once the walk is done.
    late_exports: Vec<String>,
}

impl Collector {
    fn module_item(&mut self, item: &ModuleItem) {
        match item {
            ModuleItem::Stmt(stmt) => self.stmt(stmt),
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                self.decl(&export.decl, true);
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => {
                match &export.decl {
                    DefaultDecl::Fn(func) => {
                        let name = func
                            .ident
                            .as_ref()
                            .map(|i| i.sym.to_string())
                            .unwrap_or_else(|| "default".to_string());
                        self.record(name, DeclKind::Function, true);
                    }
                    DefaultDecl::Class(class) => {
                        let name = class
                            .ident
                            .as_ref()
                            .map(|i| i.sym.to_string())
                            .unwrap_or_else(|| "default".to_string());
                        self.record(name, DeclKind::Class, true);
                    }
                    DefaultDecl::TsInterfaceDecl(iface) => {
                        self.record(iface.id.sym.to_string(), DeclKind::Interface, true);
                    }
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(export)) => {
                if let Expr::Ident(ident) = &*export.expr {
                    self.late_exports.push(ident.sym.to_string());
                }
            }
            ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)) => {
                // `export { a } from './m'` re-exports a foreign declaration;
                // its kind is not observable in this file, so only local
                // lists are honored.
                if named.src.is_some() {
                    return;
                }
                for spec in &named.specifiers {
                    if let swc_ecma_ast::ExportSpecifier::Named(named_spec) = spec {
                        if let ModuleExportName::Ident(ident) = &named_spec.orig {
                            self.late_exports.push(ident.sym.to_string());
                        }
                    }
                }
            }
            ModuleItem::ModuleDecl(_) => {}
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Decl(decl) = stmt {
            self.decl(decl, false);
        }
    }

    fn decl(&mut self, decl: &Decl, exported: bool) {
        match decl {
            Decl::Fn(func) => {
                self.record(func.ident.sym.to_string(), DeclKind::Function, exported);
            }
            Decl::Class(class) => {
                self.record(class.ident.sym.to_string(), DeclKind::Class, exported);
            }
            Decl::TsInterface(iface) => {
                self.record(iface.id.sym.to_string(), DeclKind::Interface, exported);
            }
            Decl::TsTypeAlias(alias) => {
                self.record(alias.id.sym.to_string(), DeclKind::Type, exported);
            }
            Decl::TsEnum(ts_enum) => {
                self.record(ts_enum.id.sym.to_string(), DeclKind::Enum, exported);
            }
            Decl::Var(var) => {
                for declarator in &var.decls {
                    let Pat::Ident(binding) = &declarator.name else {
                        continue;
                    };
                    let is_function = matches!(
                        declarator.init.as_deref(),
                        Some(Expr::Arrow(_)) | Some(Expr::Fn(_))
                    );
                    if is_function {
                        self.record(binding.id.sym.to_string(), DeclKind::Function, exported);
                    }
                }
            }
            _ => {}
        }
    }

    /// Record a declaration site, keeping at most one record per
    /// (name, kind). A later exported sighting upgrades an earlier
    /// unexported one.
    fn record(&mut self, name: String, kind: DeclKind, exported: bool) {
        if let Some(existing) = self
            .records
            .iter_mut()
            .find(|r| r.name == name && r.kind == kind)
        {
            existing.exported |= exported;
        } else {
            self.records.push(ExportRecord {
                name,
                kind,
                exported,
            });
        }
    }

    fn finish(mut self) -> Vec<ExportRecord> {
        for name in &self.late_exports {
            for record in self.records.iter_mut().filter(|r| &r.name == name) {
                record.exported = true;
            }
        }
        self.records
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
