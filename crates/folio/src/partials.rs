//! Named, parameterized composition units.
//!
//! A page references partials by name. Resolution looks each name up in the
//! [`PartialRegistry`], checks required props and decodes them into typed
//! props; rendering turns the typed props into a subtree built from widgets.

use crate::content::{ImageRef, Page, PartialSpec, Project};
use crate::error::{FolioError, Result};
use crate::markdown::MarkdownPipeline;
use crate::tree::{Element, Node, RenderedTree};
use crate::widgets::Widget;
use rayon::prelude::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartialKind {
    Hero,
    ProjectList,
    Footer,
    Prose,
}

impl PartialKind {
    pub const BUILTIN: [PartialKind; 4] = [
        PartialKind::Hero,
        PartialKind::ProjectList,
        PartialKind::Footer,
        PartialKind::Prose,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PartialKind::Hero => "Hero",
            PartialKind::ProjectList => "ProjectList",
            PartialKind::Footer => "Footer",
            PartialKind::Prose => "Prose",
        }
    }

    pub fn required_props(&self) -> &'static [&'static str] {
        match self {
            PartialKind::Hero => &["title", "description", "avatar"],
            PartialKind::ProjectList => &["title", "projects"],
            PartialKind::Footer => &["text"],
            PartialKind::Prose => &["body"],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeroProps {
    pub title: String,
    #[serde(default)]
    pub highlight: Option<String>,
    #[serde(default)]
    pub title_suffix: Option<String>,
    pub description: String,
    pub avatar: ImageRef,
    #[serde(default)]
    pub socials: Vec<SocialLink>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocialLink {
    pub href: String,
    pub icon: ImageRef,
}

impl SocialLink {
    /// Social links must be absolute `http`, `https` or `mailto` URLs.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.href.trim().is_empty() {
            return Err("social link href must not be empty".to_string());
        }
        let parsed = url::Url::parse(&self.href).map_err(|error| {
            format!("social link '{}' is not an absolute URL: {}", self.href, error)
        })?;
        match parsed.scheme() {
            "http" | "https" | "mailto" => Ok(()),
            scheme => Err(format!(
                "social link '{}' uses unsupported scheme '{}'",
                self.href, scheme
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectListProps {
    pub title: String,
    #[serde(default)]
    pub highlight: Option<String>,
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FooterProps {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProseProps {
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub enum Partial {
    Hero(HeroProps),
    ProjectList(ProjectListProps),
    Footer(FooterProps),
    Prose(ProseProps),
}

/// A partial with its props decoded, plus the name the page used for it.
#[derive(Debug, Clone)]
pub struct ResolvedPartial {
    pub name: String,
    pub partial: Partial,
}

#[derive(Debug, Clone)]
pub struct ResolvedPage {
    pub route: String,
    pub partials: Vec<ResolvedPartial>,
}

pub struct PartialRegistry {
    kinds: HashMap<String, PartialKind>,
}

impl Default for PartialRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl PartialRegistry {
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        for kind in PartialKind::BUILTIN {
            registry.register(kind.name(), kind);
        }
        registry
    }

    /// Registers `name` as another name for a built-in partial kind.
    pub fn register(&mut self, name: impl Into<String>, kind: PartialKind) {
        self.kinds.insert(name.into(), kind);
    }

    pub fn get(&self, name: &str) -> Option<PartialKind> {
        self.kinds.get(name).copied()
    }

    pub fn resolve_page(&self, page: &Page) -> Result<ResolvedPage> {
        let partials = page
            .partials
            .iter()
            .map(|spec| self.resolve_partial(page, spec))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResolvedPage {
            route: page.path.clone(),
            partials,
        })
    }

    fn resolve_partial(&self, page: &Page, spec: &PartialSpec) -> Result<ResolvedPartial> {
        let kind = self
            .get(&spec.name)
            .ok_or_else(|| FolioError::UnknownPartial {
                page: page.path.clone(),
                partial: spec.name.clone(),
            })?;

        for prop in kind.required_props() {
            if !spec.props.contains(prop) {
                return Err(FolioError::MissingProp {
                    page: page.path.clone(),
                    partial: spec.name.clone(),
                    prop: prop.to_string(),
                });
            }
        }

        let partial = match kind {
            PartialKind::Hero => {
                let props: HeroProps = decode_props(page, spec)?;
                for social in &props.socials {
                    social.validate().map_err(|message| FolioError::InvalidProp {
                        page: page.path.clone(),
                        partial: spec.name.clone(),
                        message,
                    })?;
                }
                Partial::Hero(props)
            }
            PartialKind::ProjectList => {
                let props: ProjectListProps = decode_props(page, spec)?;
                for project in &props.projects {
                    project
                        .validate()
                        .map_err(|message| FolioError::InvalidProject {
                            page: page.path.clone(),
                            name: project.name.clone(),
                            message,
                        })?;
                }
                Partial::ProjectList(props)
            }
            PartialKind::Footer => Partial::Footer(decode_props(page, spec)?),
            PartialKind::Prose => Partial::Prose(decode_props(page, spec)?),
        };

        Ok(ResolvedPartial {
            name: spec.name.clone(),
            partial,
        })
    }
}

fn decode_props<T: DeserializeOwned>(page: &Page, spec: &PartialSpec) -> Result<T> {
    let invalid = |message: String| FolioError::InvalidProp {
        page: page.path.clone(),
        partial: spec.name.clone(),
        message,
    };
    let value = serde_json::to_value(&spec.props).map_err(|error| invalid(error.to_string()))?;
    serde_json::from_value(value).map_err(|error| invalid(error.to_string()))
}

impl ResolvedPage {
    /// Concatenates the partial subtrees in declared order. Partials render
    /// independently of each other.
    pub fn render(&self, markdown: &MarkdownPipeline) -> Result<RenderedTree> {
        let subtrees = self
            .partials
            .par_iter()
            .map(|resolved| {
                let document = format!("{}#{}", self.route, resolved.name);
                resolved.partial.render(&document, markdown)
            })
            .collect::<Result<Vec<Node>>>()?;
        Ok(RenderedTree::new(self.route.clone(), subtrees))
    }
}

impl Partial {
    pub fn render(&self, document: &str, markdown: &MarkdownPipeline) -> Result<Node> {
        match self {
            Partial::Hero(props) => {
                let mut title = vec![Node::text(props.title.clone())];
                if let Some(highlight) = &props.highlight {
                    title.push(
                        Widget::GradientText {
                            text: highlight.clone(),
                        }
                        .render(),
                    );
                }
                if let Some(suffix) = &props.title_suffix {
                    title.push(Node::text(suffix.clone()));
                }

                let social_buttons = props
                    .socials
                    .iter()
                    .map(|social| {
                        Widget::HeroSocial {
                            href: social.href.clone(),
                            icon: social.icon.clone(),
                        }
                        .render()
                    })
                    .collect();

                let avatar = Widget::HeroAvatar {
                    title,
                    description: markdown.render(document, &props.description)?,
                    avatar: Node::image(props.avatar.clone(), Some("h-80 w-64")),
                    social_buttons,
                }
                .render();

                Ok(Widget::Section {
                    title: None,
                    children: vec![avatar],
                }
                .render())
            }
            Partial::ProjectList(props) => {
                let title = match &props.highlight {
                    Some(highlight) => vec![
                        Node::text(format!("{} ", props.title)),
                        Widget::GradientText {
                            text: highlight.clone(),
                        }
                        .render(),
                    ],
                    None => vec![Node::text(props.title.clone())],
                };

                let cards = props
                    .projects
                    .iter()
                    .map(|project| -> Result<Node> {
                        let document = format!("{}/{}", document, project.name);
                        Ok(Widget::ProjectCard {
                            name: project.name.clone(),
                            description: markdown.render(&document, &project.description)?,
                            link: project.link.clone(),
                            image: project.image.clone(),
                            category: project
                                .tags
                                .iter()
                                .map(|tag| Widget::TagBadge { tag: tag.clone() }.render())
                                .collect(),
                        }
                        .render())
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(Widget::Section {
                    title: Some(title),
                    children: vec![
                        Element::new("div")
                            .class("flex flex-col gap-6")
                            .children(cards)
                            .into(),
                    ],
                }
                .render())
            }
            Partial::Footer(props) => Ok(Widget::Section {
                title: None,
                children: vec![
                    Element::new("p")
                        .class("text-center")
                        .text(props.text.clone())
                        .into(),
                ],
            }
            .render()),
            Partial::Prose(props) => Ok(Widget::Section {
                title: props
                    .title
                    .as_ref()
                    .map(|title| vec![Node::text(title.clone())]),
                children: vec![
                    Element::new("div")
                        .class("prose")
                        .children(markdown.render(document, &props.body)?)
                        .into(),
                ],
            }
            .render()),
        }
    }
}

/// Resolves and renders a single page.
pub fn compose_page(
    page: &Page,
    registry: &PartialRegistry,
    markdown: &MarkdownPipeline,
) -> Result<RenderedTree> {
    registry.resolve_page(page)?.render(markdown)
}
