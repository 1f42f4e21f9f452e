//! Entry points
//!
//!     source ─ lexing ─ parsing ─ gobbling ─ ast::build ─ Template ─ Evaluator ─ String
//!
//!     [compile] runs the front half once; the resulting [Template] can be rendered any
//!     number of times, each render with fresh scopes and a fresh macro table. [render] and
//!     [render_with_loader] drive the async evaluator on a private current-thread tokio
//!     runtime, so they must not be called from inside another runtime; async callers use
//!     [render_async] or [Template::render_async].

use crate::vtl::ast::{self, builder};
use crate::vtl::config::RenderOptions;
use crate::vtl::error::Error;
use crate::vtl::gobbling;
use crate::vtl::lexing::tokenize;
use crate::vtl::parsing::{parse_expression_template, parse_segments};
use crate::vtl::runtime::{Context, Evaluator, NoLoader, ResourceLoader};

/// Lex, parse, gobble and build the AST of `source`.
pub fn compile(source: &str, options: &RenderOptions) -> Result<ast::Template, Error> {
    let tokens = tokenize(source)?;
    let mut segments = parse_segments(source, tokens, options.max_nesting_depth)?;
    gobbling::apply(options.space_gobbling, &mut segments);
    let expression = parse_expression_template(source, options.max_nesting_depth);
    Ok(builder::build(
        source,
        segments,
        expression,
        options.max_nesting_depth,
    ))
}

/// Render `source` against `context`. `#parse` and `#include` fail (see [NoLoader]).
pub fn render(source: &str, context: &Context, options: &RenderOptions) -> Result<String, Error> {
    render_with_loader(source, context, options, &NoLoader)
}

/// Render `source`, resolving `#parse`/`#include` through `loader`.
pub fn render_with_loader<L: ResourceLoader>(
    source: &str,
    context: &Context,
    options: &RenderOptions,
    loader: &L,
) -> Result<String, Error> {
    block_on(render_async(source, context, options, loader))?
}

pub async fn render_async<L: ResourceLoader>(
    source: &str,
    context: &Context,
    options: &RenderOptions,
    loader: &L,
) -> Result<String, Error> {
    let template = Template::compile(source, options.clone())?;
    template.render_async(context, loader).await
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, Error> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| Error::Runtime(format!("cannot start the render runtime: {}", error)))?;
    Ok(runtime.block_on(future))
}

/// A compiled template together with the options it was compiled with.
///
/// Macro definitions and values are reference counted with `Rc`, so a `Template`, a
/// [Context] and the future returned by [Template::render_async] are `!Send`. Compile once
/// per thread, or drive renders with a current-thread runtime or a `LocalSet` rather than
/// `tokio::spawn` on a multi-threaded runtime.
#[derive(Debug, Clone)]
pub struct Template {
    ast: ast::Template,
    options: RenderOptions,
}

impl Template {
    pub fn compile(source: &str, options: RenderOptions) -> Result<Self, Error> {
        if !is_utf8(&options.encoding) {
            log::debug!(
                "declared encoding {} ignored, sources are already decoded",
                options.encoding
            );
        }
        let ast = compile(source, &options)?;
        Ok(Template { ast, options })
    }

    pub fn ast(&self) -> &ast::Template {
        &self.ast
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render(&self, context: &Context) -> Result<String, Error> {
        self.render_with_loader(context, &NoLoader)
    }

    pub fn render_with_loader<L: ResourceLoader>(
        &self,
        context: &Context,
        loader: &L,
    ) -> Result<String, Error> {
        block_on(self.render_async(context, loader))?
    }

    pub async fn render_async<L: ResourceLoader>(
        &self,
        context: &Context,
        loader: &L,
    ) -> Result<String, Error> {
        Evaluator::new(context, &self.options, loader)
            .render(&self.ast)
            .await
    }
}

fn is_utf8(encoding: &str) -> bool {
    matches!(
        encoding.to_ascii_lowercase().as_str(),
        "utf-8" | "utf8"
    )
}
