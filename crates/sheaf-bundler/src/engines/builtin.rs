use async_trait::async_trait;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use sheaf_graph::ModuleId;

use super::{ContentKind, EngineError, TransformEngine, TransformInput, TransformOutput};

/// Marks code as script. Transpilation belongs to external engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptEngine;

#[async_trait]
impl TransformEngine for ScriptEngine {
    fn name(&self) -> &str {
        "script"
    }

    async fn transform(&self, input: TransformInput) -> Result<TransformOutput, EngineError> {
        Ok(TransformOutput {
            code: input.code,
            kind: ContentKind::Script,
        })
    }
}

/// Normalizes a style sheet: line endings and trailing whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssEngine;

#[async_trait]
impl TransformEngine for CssEngine {
    fn name(&self) -> &str {
        "css"
    }

    async fn transform(&self, input: TransformInput) -> Result<TransformOutput, EngineError> {
        let mut code: String = input
            .code
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        code.push('\n');
        Ok(TransformOutput {
            code,
            kind: ContentKind::Style,
        })
    }
}

/// Keeps a style sheet as style so the renderer moves it into the chunk's `.css`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssExtractEngine;

#[async_trait]
impl TransformEngine for CssExtractEngine {
    fn name(&self) -> &str {
        "css-extract"
    }

    async fn transform(&self, input: TransformInput) -> Result<TransformOutput, EngineError> {
        if input.kind != ContentKind::Style {
            return Err(EngineError::Failed(format!(
                "expected a style sheet, got {:?} output",
                input.kind
            )));
        }
        Ok(TransformOutput {
            code: input.code,
            kind: ContentKind::Style,
        })
    }
}

/// Turns a style sheet into a script that appends a `<style>` element.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleInjectEngine;

#[async_trait]
impl TransformEngine for StyleInjectEngine {
    fn name(&self) -> &str {
        "style-inject"
    }

    async fn transform(&self, input: TransformInput) -> Result<TransformOutput, EngineError> {
        Ok(TransformOutput {
            code: inject_style(&input.module, &input.code),
            kind: ContentKind::Script,
        })
    }
}

/// Script body that appends `css` to the document head.
pub fn inject_style(module: &ModuleId, css: &str) -> String {
    let css = serde_json::Value::String(css.to_string());
    let id = serde_json::Value::String(module.to_string());
    format!(
        "var style = document.createElement(\"style\");\n\
         style.setAttribute(\"data-sheaf-module\", {id});\n\
         style.textContent = {css};\n\
         document.head.appendChild(style);\n\
         module.exports = {{}};\n"
    )
}

/// Minifies one script module with oxc: parse, compress, mangle local names, then
/// print without whitespace. Literal values come out exactly as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinifyEngine;

impl MinifyEngine {
    pub fn minify(module: &ModuleId, code: &str) -> Result<String, EngineError> {
        let allocator = Allocator::default();
        let source_type =
            SourceType::from_path(module.as_str()).unwrap_or_else(|_| SourceType::mjs());
        let parsed = Parser::new(&allocator, code, source_type).parse();
        if let Some(err) = parsed.errors.first() {
            return Err(EngineError::Failed(format!("cannot parse {module}: {err}")));
        }
        if parsed.panicked {
            return Err(EngineError::Failed(format!("cannot parse {module}")));
        }

        let mut program = parsed.program;
        let options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions::default()),
        };
        let minified = Minifier::new(options).minify(&allocator, &mut program);
        let printed = Codegen::new()
            .with_options(CodegenOptions {
                minify: true,
                ..CodegenOptions::default()
            })
            .with_scoping(minified.scoping)
            .build(&program);
        Ok(printed.code)
    }
}

#[async_trait]
impl TransformEngine for MinifyEngine {
    fn name(&self) -> &str {
        "minify"
    }

    async fn transform(&self, input: TransformInput) -> Result<TransformOutput, EngineError> {
        let TransformInput { module, code, kind, .. } = input;
        let code = tokio::task::spawn_blocking(move || Self::minify(&module, &code))
            .await
            .map_err(|err| EngineError::Failed(err.to_string()))??;
        Ok(TransformOutput { code, kind })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use sheaf_config::Mode;

    use super::*;

    fn input(code: &str, kind: ContentKind) -> TransformInput {
        TransformInput {
            module: ModuleId::new("client/app.css").unwrap(),
            code: code.to_string(),
            kind,
            options: Value::Null,
            mode: Mode::Development,
        }
    }

    #[tokio::test]
    async fn style_inject_produces_script() {
        let out = StyleInjectEngine
            .transform(input("body { color: red; }", ContentKind::Style))
            .await
            .unwrap();
        assert_eq!(out.kind, ContentKind::Script);
        assert!(out.code.contains(r#"style.textContent = "body { color: red; }";"#));
        assert!(out.code.contains(r#""client/app.css""#));
    }

    #[tokio::test]
    async fn css_extract_rejects_scripts() {
        let err = CssExtractEngine
            .transform(input("export {}", ContentKind::Script))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Failed(_)));
    }

    fn minify(name: &str, code: &str) -> Result<String, EngineError> {
        MinifyEngine::minify(&ModuleId::new(name).unwrap(), code)
    }

    #[test]
    fn minify_strips_layout_whitespace() {
        let code = "function add(first, second) {\n\n    return first + second;\n}\nexport { add };\n";
        let out = minify("client/add.js", code).unwrap();
        assert!(out.len() < code.len());
        assert!(!out.contains("\n    "));
        assert!(out.contains("export"));
    }

    #[test]
    fn minify_keeps_multi_line_literals_intact() {
        let code = "export const poem = `line one\n\n    indented line`;\n\
                    export const path = \"a  b\";\n";
        let out = minify("client/poem.js", code).unwrap();
        assert!(
            out.contains("line one\n\n    indented line")
                || out.contains("line one\\n\\n    indented line"),
            "{out}"
        );
        assert!(out.contains("a  b"), "{out}");
    }

    #[test]
    fn minify_accepts_typescript_modules() {
        let out = minify("client/greet.ts", "export const greet = (name) => name;\n");
        assert!(out.is_ok(), "{out:?}");
    }

    #[test]
    fn minify_reports_syntax_errors() {
        let err = minify("client/broken.js", "export const = ;").unwrap_err();
        assert!(matches!(err, EngineError::Failed(message) if message.contains("client/broken.js")));
    }

    #[tokio::test]
    async fn minify_engine_keeps_content_kind() {
        let out = MinifyEngine
            .transform(TransformInput {
                module: ModuleId::new("client/app.js").unwrap(),
                code: "var answer = 42;\nconsole.log(answer);\n".to_string(),
                kind: ContentKind::Script,
                options: Value::Null,
                mode: Mode::Production,
            })
            .await
            .unwrap();
        assert_eq!(out.kind, ContentKind::Script);
        assert!(out.code.contains("42"));
    }
}
