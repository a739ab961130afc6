//! Presentational primitives.
//!
//! Each widget takes typed props and produces a markup subtree. Partials build
//! pages out of these and never look at the markup they return.

use crate::content::{ImageRef, Tag};
use crate::tree::{Element, Node};

pub enum Widget {
    Section {
        title: Option<Vec<Node>>,
        children: Vec<Node>,
    },
    GradientText {
        text: String,
    },
    HeroAvatar {
        title: Vec<Node>,
        description: Vec<Node>,
        avatar: Node,
        social_buttons: Vec<Node>,
    },
    HeroSocial {
        href: String,
        icon: ImageRef,
    },
    ProjectCard {
        name: String,
        description: Vec<Node>,
        link: String,
        image: ImageRef,
        category: Vec<Node>,
    },
    TagBadge {
        tag: Tag,
    },
}

impl Widget {
    pub fn render(self) -> Node {
        match self {
            Widget::Section { title, children } => {
                let mut section = Element::new("section").class("mx-auto max-w-screen-lg px-3 py-6");
                if let Some(title) = title {
                    section = section.child(
                        Element::new("div")
                            .class("mb-6 text-2xl font-bold")
                            .children(title),
                    );
                }
                section.children(children).into()
            }
            Widget::GradientText { text } => Element::new("span")
                .class("bg-gradient-to-br from-sky-500 to-cyan-400 bg-clip-text text-transparent")
                .text(text)
                .into(),
            Widget::HeroAvatar {
                title,
                description,
                avatar,
                social_buttons,
            } => Element::new("div")
                .class("flex flex-col items-center md:flex-row md:justify-between md:gap-x-24")
                .child(
                    Element::new("div")
                        .child(
                            Element::new("h1")
                                .class("text-3xl font-bold")
                                .children(title),
                        )
                        .child(
                            Element::new("div")
                                .class("mt-6 text-xl leading-9")
                                .children(description),
                        )
                        .child(
                            Element::new("div")
                                .class("mt-3 flex gap-1")
                                .children(social_buttons),
                        ),
                )
                .child(Element::new("div").class("shrink-0").child(avatar))
                .into(),
            Widget::HeroSocial { href, icon } => Element::new("a")
                .attr("href", href)
                .child(Node::image(icon, Some("h-12 w-12 hover:translate-y-1")))
                .into(),
            Widget::ProjectCard {
                name,
                description,
                link,
                image,
                category,
            } => Element::new("div")
                .class("flex flex-col items-center gap-x-8 rounded-md bg-slate-800 p-3 md:flex-row")
                .child(
                    Element::new("div").class("shrink-0").child(
                        Element::new("a")
                            .attr("href", link.clone())
                            .child(Node::image(image, Some("h-36 w-36 hover:translate-y-1"))),
                    ),
                )
                .child(
                    Element::new("div")
                        .child(
                            Element::new("div")
                                .class("flex flex-col items-center gap-y-2 md:flex-row")
                                .child(
                                    Element::new("a")
                                        .class("hover:text-cyan-400")
                                        .attr("href", link)
                                        .child(
                                            Element::new("div")
                                                .class("text-xl font-semibold")
                                                .text(name),
                                        ),
                                )
                                .child(
                                    Element::new("div")
                                        .class("ml-3 flex flex-wrap gap-2")
                                        .children(category),
                                ),
                        )
                        .child(
                            Element::new("div")
                                .class("mt-3 text-gray-400")
                                .children(description),
                        ),
                )
                .into(),
            Widget::TagBadge { tag } => {
                let color = tag.color.name();
                Element::new("div")
                    .class(format!(
                        "rounded-md px-2 py-1 text-xs font-semibold bg-{color}-400 text-{color}-900"
                    ))
                    .text(tag.label.trim())
                    .into()
            }
        }
    }
}
