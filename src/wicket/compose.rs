//! Turning a fragment name into a finished page: climb the extend
//! chain, splice in panels, strip the namespace markup and fill in
//! the head.

use std::path::PathBuf;

use itertools::Itertools;
use kstring::KString;

use crate::{str_util::str_take_chars, time_guard, info};
use super::{directive::{find_extend_directive, find_include_directive, graft_child},
            error::{RenderError, RenderErrorKind},
            head::HeadContributions,
            resolver::{FragmentLocator, FragmentResolver, TreeLocator},
            strip::strip,
            substitute::{render, UndefinedVariables},
            variables::{extract_extend_variables, extract_inline_variables, VariableSet}};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub undefined_variables: UndefinedVariables,
    /// Upper bound for panel inclusions in one render pass, to stop
    /// panels including themselves.
    pub max_panel_inclusions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            undefined_variables: UndefinedVariables::default(),
            max_panel_inclusions: 1000,
        }
    }
}

/// The places already visited on an extend chain, by name for
/// reporting and by resolved path for detecting cycles.
struct Chain {
    names: Vec<KString>,
    paths: Vec<PathBuf>,
}

impl Chain {
    fn trail(&self, next: &str) -> String {
        self.names.iter().map(|n| n.as_str()).chain(std::iter::once(next)).join(" -> ")
    }
}

#[derive(Debug)]
pub struct Composer<L: FragmentLocator = TreeLocator> {
    resolver: FragmentResolver<L>,
    config: EngineConfig,
}

impl<L: FragmentLocator> Composer<L> {
    pub fn new(resolver: FragmentResolver<L>, config: EngineConfig) -> Self {
        Composer { resolver, config }
    }

    pub fn resolver(&self) -> &FragmentResolver<L> {
        &self.resolver
    }

    fn substitute(&self, markup: &str, variables: &VariableSet) -> Result<String, RenderError> {
        render(markup, variables, self.config.undefined_variables)
    }

    /// Replace the markup by its ancestors as long as it starts an
    /// extend directive, then substitute the variables. `origin` is
    /// the name `markup` was loaded from, if any. Defaults from `with`
    /// clauses are added to `variables` unless already set, head
    /// contributions of every level but the last are added to `head`.
    pub fn expand_pages(
        &self,
        origin: Option<&str>,
        markup: String,
        variables: &mut VariableSet,
        head: &mut HeadContributions,
    ) -> Result<String, RenderError> {
        let mut chain = Chain { names: Vec::new(), paths: Vec::new() };
        if let Some(name) = origin {
            chain.names.push(KString::from_ref(name));
            if let Some(path) = self.resolver.path(name)? {
                chain.paths.push(path);
            }
        }
        let mut markup = markup;
        loop {
            let directive = match find_extend_directive(&markup) {
                Some(d) => d,
                None => return self.substitute(&markup, variables)
            };
            let ancestor = KString::from_ref(directive.ancestor);
            let not_found = || -> RenderError {
                RenderErrorKind::AncestorNotFound {
                    ancestor: ancestor.clone(),
                    snippet: str_take_chars(&markup, 50).to_string(),
                }.into()
            };
            let path = self.resolver.path(&ancestor)?.ok_or_else(not_found)?;
            if chain.paths.contains(&path) || chain.names.contains(&ancestor) {
                return Err(RenderErrorKind::CyclicTemplateReference {
                    trail: chain.trail(&ancestor)
                }.into())
            }
            let ancestor_markup = self.resolver.resolve(&ancestor)?.ok_or_else(not_found)?;
            if let Some(clause) = directive.with_clause {
                variables.merge_first_wins(extract_extend_variables(clause)?);
            }
            let grafted = graft_child(&ancestor_markup, directive.content).ok_or_else(
                || RenderError::from(RenderErrorKind::MissingChildSlot {
                    ancestor: ancestor.clone()
                }))?;
            head.collect(&markup);
            chain.names.push(ancestor);
            chain.paths.push(path);
            markup = grafted;
        }
    }

    /// Replace include directives by the rendered panels they name,
    /// leftmost first, until none are left, then give the result a
    /// last expansion with `variables`. Each panel is rendered with
    /// `variables` overridden by the directive's attributes; its head
    /// contributions are dropped.
    pub fn include_panels(
        &self,
        markup: String,
        variables: &VariableSet,
    ) -> Result<String, RenderError> {
        let mut markup = markup;
        let mut included: Vec<KString> = Vec::new();
        loop {
            let (span, panel, local) = match find_include_directive(&markup) {
                Some(d) => (d.span,
                            KString::from_ref(d.panel),
                            extract_inline_variables(d.attributes)),
                None => {
                    let mut variables = variables.clone();
                    return self.expand_pages(None, markup, &mut variables,
                                             &mut HeadContributions::new())
                }
            };
            if included.len() >= self.config.max_panel_inclusions {
                let tail = included.len().saturating_sub(5);
                return Err(RenderErrorKind::CyclicTemplateReference {
                    trail: format!("more than {} panel inclusions, last: {}",
                                   self.config.max_panel_inclusions,
                                   included[tail..].iter().chain(std::iter::once(&panel))
                                   .join(" -> "))
                }.into())
            }
            let panel_markup = self.resolver.resolve(&panel)?.ok_or_else(
                || RenderError::from(RenderErrorKind::PanelNotFound {
                    panel: panel.clone()
                }))?;
            let mut scope = variables.merge_override_wins(&local);
            let expanded = self.expand_pages(Some(&panel), panel_markup, &mut scope,
                                             &mut HeadContributions::new())?;
            let rendered = self.substitute(&expanded, &scope)?;
            markup.replace_range(span, &rendered);
            included.push(panel);
        }
    }

    /// Render the fragment `name` (a page, panel or dialog) with
    /// `variables` (usually from the query string) taking precedence
    /// over all defaults.
    pub fn render_fragment(
        &self,
        name: &str,
        variables: VariableSet,
    ) -> Result<String, RenderError> {
        let mut variables = variables;
        let markup = {
            time_guard!("resolve");
            self.resolver.resolve(name)?.ok_or_else(
                || RenderError::from(RenderErrorKind::FragmentNotFound {
                    name: KString::from_ref(name)
                }))?
        };
        let mut head = HeadContributions::new();
        let expanded = {
            time_guard!("expand_pages");
            self.expand_pages(Some(name), markup, &mut variables, &mut head)?
        };
        let included = {
            time_guard!("include_panels");
            self.include_panels(expanded, &variables)?
        };
        let stripped = {
            time_guard!("strip");
            strip(&included)
        };
        info!("rendered {name:?} with {} variables, {} head blocks",
              variables.len(), head.blocks().len());
        Ok(head.splice(&stripped))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
    use anyhow::Result;
    use crate::wicket::resolver::tests::{write_files, CountingLocator};

    const BASE: &str = "<html><head><title>[title]</title><!-- wicket-head --></head>\
                        <body><wicket:child></wicket:child></body></html>";

    fn fixtures(root: &std::path::Path) -> Result<()> {
        write_files(root, &[
            ("base/Base.html", BASE),
            ("base/Middle.html",
             "<wicket:head><link rel=\"m\"></wicket:head>\n\
              <!-- extend-page=\"Base.html\" with=\"title: Middle, name: Bob\" -->\n\
              <wicket:extend><div><wicket:child></wicket:child></div></wicket:extend>\n"),
            ("pages/HomePage.html",
             "<wicket:head><link rel=\"h\"></wicket:head>\n\
              <!-- extend-page=\"Middle.html\" with=\"name: Carol\" -->\n\
              <wicket:extend><p>Hello [name] from [title]</p></wicket:extend>\n"),
            ("panels/GreetingPanel.html",
             "<wicket:panel><span class=\"greeting\">Hi [who]</span></wicket:panel>"),
            ("panels/OuterPanel.html",
             "<wicket:panel><em>[who]</em>\
              <!-- include-panel=\"GreetingPanel.html\" --></wicket:panel>"),
            ("pages/PanelPage.html",
             "<!-- extend-page=\"Base.html\" with=\"title: Panels, who: Everyone\" -->\n\
              <wicket:extend><p>[who]</p>\
              <!-- include-panel=\"GreetingPanel.html\" who=\"World\" --></wicket:extend>"),
            ("pages/NestedPage.html",
             "<!-- extend-page=\"Base.html\" with=\"title: Nested, who: Everyone\" -->\n\
              <wicket:extend><!-- include-panel=\"OuterPanel.html\" who=\"Inner\" -->\
              </wicket:extend>"),
            ("pages/PlainPage.html",
             "<p class=\"x\">[a] &amp; [1] <b wicket:id=\"b\">bold</b></p>\n"),
            ("pages/OrphanPage.html",
             "<!-- extend-page=\"NoSlot.html\" -->\n<wicket:extend>x</wicket:extend>"),
            ("base/NoSlot.html", "<html><body></body></html>"),
            ("pages/LostPage.html",
             "<!-- extend-page=\"Nowhere.html\" -->\n<wicket:extend>x</wicket:extend>"),
            ("pages/LoopPage.html",
             "<!-- extend-page=\"pages/LoopPage.html\" -->\n<wicket:extend>x</wicket:extend>"),
            ("pages/PingPage.html",
             "<!-- extend-page=\"PongPage.html\" -->\n<wicket:extend>ping</wicket:extend>"),
            ("pages/PongPage.html",
             "<!-- extend-page=\"PingPage.html\" -->\n\
              <wicket:extend><wicket:child></wicket:child></wicket:extend>"),
            ("panels/SelfPanel.html",
             "<wicket:panel><!-- include-panel=\"SelfPanel.html\" --></wicket:panel>"),
            ("pages/SelfPage.html", "<!-- include-panel=\"SelfPanel.html\" -->"),
            ("pages/BadWithPage.html",
             "<!-- extend-page=\"Base.html\" with=\"title\" -->\n\
              <wicket:extend>x</wicket:extend>"),
        ])
    }

    fn composer(root: &std::path::Path, config: EngineConfig) -> Composer {
        Composer::new(FragmentResolver::new(TreeLocator::new(vec![root.to_path_buf()])),
                      config)
    }

    fn kind(r: Result<String, RenderError>) -> RenderErrorKind {
        r.expect_err("should fail").into_kind()
    }

    #[test]
    fn t_three_level_inheritance() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fixtures(dir.path())?;
        let c = composer(dir.path(), EngineConfig::default());
        assert_eq!(
            c.render_fragment("HomePage.html", VariableSet::new())?,
            "<html><head><title>Middle</title><link rel=\"h\">\n<link rel=\"m\"></head>\
             <body><div><p>Hello Carol from Middle</p></div></body></html>");
        Ok(())
    }

    #[test]
    fn t_query_beats_with_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fixtures(dir.path())?;
        let c = composer(dir.path(), EngineConfig::default());
        let vars: VariableSet = [("name", "Alice")].into_iter().collect();
        let html = c.render_fragment("HomePage.html", vars)?;
        assert!(html.contains("<p>Hello Alice from Middle</p>"));
        Ok(())
    }

    #[test]
    fn t_panel_scope() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fixtures(dir.path())?;
        let c = composer(dir.path(), EngineConfig::default());
        assert_eq!(
            c.render_fragment("PanelPage.html", VariableSet::new())?,
            "<html><head><title>Panels</title></head><body><p>Everyone</p>\
             <span class=\"greeting\">Hi World</span></body></html>");
        Ok(())
    }

    #[test]
    fn t_nested_panel_sees_outer_scope() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fixtures(dir.path())?;
        let c = composer(dir.path(), EngineConfig::default());
        let html = c.render_fragment("NestedPage.html", VariableSet::new())?;
        assert!(html.contains("<em>Inner</em><span class=\"greeting\">Hi Everyone</span>"),
                "{html}");
        Ok(())
    }

    #[test]
    fn t_plain_fragment() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fixtures(dir.path())?;
        let c = composer(dir.path(), EngineConfig::default());
        let vars: VariableSet = [("a", "A")].into_iter().collect();
        assert_eq!(c.render_fragment("PlainPage.html", vars)?,
                   "<p class=\"x\">A &amp; [1] <b>bold</b></p>\n");
        Ok(())
    }

    #[test]
    fn t_undefined_variables_policy() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fixtures(dir.path())?;
        let c = composer(dir.path(), EngineConfig {
            undefined_variables: UndefinedVariables::Keep,
            ..EngineConfig::default()
        });
        assert!(c.render_fragment("PlainPage.html", VariableSet::new())?
                .starts_with("<p class=\"x\">[a] &amp;"));
        let c = composer(dir.path(), EngineConfig {
            undefined_variables: UndefinedVariables::Fail,
            ..EngineConfig::default()
        });
        match kind(c.render_fragment("PlainPage.html", VariableSet::new())) {
            RenderErrorKind::UndefinedVariable { name } => assert_eq!(name.as_str(), "a"),
            k => panic!("unexpected {k:?}"),
        }
        Ok(())
    }

    #[test]
    fn t_errors() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fixtures(dir.path())?;
        let c = composer(dir.path(), EngineConfig::default());
        let render = |name: &str| c.render_fragment(name, VariableSet::new());

        assert!(render("NoSuchPage.html").expect_err("missing").is_not_found());
        match kind(render("OrphanPage.html")) {
            RenderErrorKind::MissingChildSlot { ancestor } => assert_eq!(ancestor.as_str(), "NoSlot.html"),
            k => panic!("unexpected {k:?}"),
        }
        match kind(render("LostPage.html")) {
            RenderErrorKind::AncestorNotFound { ancestor, snippet } => {
                assert_eq!(ancestor.as_str(), "Nowhere.html");
                assert_eq!(snippet, "<!-- extend-page=\"Nowhere.html\" -->\n<wicket:extend");
            }
            k => panic!("unexpected {k:?}"),
        }
        match kind(render("BadWithPage.html")) {
            RenderErrorKind::MalformedVariableDeclaration { clause } => assert_eq!(clause, "title"),
            k => panic!("unexpected {k:?}"),
        }
        Ok(())
    }

    #[test]
    fn t_cycles() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fixtures(dir.path())?;
        let c = composer(dir.path(), EngineConfig {
            max_panel_inclusions: 20,
            ..EngineConfig::default()
        });
        let render = |name: &str| c.render_fragment(name, VariableSet::new());
        for page in ["LoopPage.html", "PingPage.html", "SelfPage.html"] {
            match kind(render(page)) {
                RenderErrorKind::CyclicTemplateReference { trail } =>
                    assert!(trail.contains(" -> "), "{trail}"),
                k => panic!("unexpected {k:?} for {page}"),
            }
        }
        match kind(render("PingPage.html")) {
            RenderErrorKind::CyclicTemplateReference { trail } =>
                assert_eq!(trail, "PingPage.html -> PongPage.html -> PingPage.html"),
            k => panic!("unexpected {k:?}"),
        }
        Ok(())
    }

    #[test]
    fn t_fragments_searched_once() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fixtures(dir.path())?;
        let searches = Arc::new(AtomicUsize::new(0));
        let c = Composer::new(
            FragmentResolver::new(CountingLocator {
                inner: TreeLocator::new(vec![dir.path().to_path_buf()]),
                searches: searches.clone(),
            }),
            EngineConfig::default());
        let first = c.render_fragment("HomePage.html", VariableSet::new())?;
        let second = c.render_fragment("HomePage.html", VariableSet::new())?;
        assert_eq!(first, second);
        // HomePage, Middle, Base
        assert_eq!(searches.load(Ordering::SeqCst), 3);
        assert_eq!(c.resolver().cached_len(), 3);
        Ok(())
    }
}
