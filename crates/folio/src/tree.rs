use crate::content::ImageRef;
use crate::xml::escape;

const VOID_ELEMENTS: &[&str] = &["img", "source", "br", "hr", "meta", "link", "input"];

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Already-rendered markup, emitted verbatim.
    Raw(String),
    /// An image that still points at its source asset.
    Image(ImageNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: &'static str,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageNode {
    pub image: ImageRef,
    pub class: Option<String>,
    pub lazy: bool,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn image(image: ImageRef, class: Option<&str>) -> Self {
        Node::Image(ImageNode {
            image,
            class: class.map(String::from),
            lazy: true,
        })
    }

    pub fn write_html(&self, output: &mut String) {
        match self {
            Node::Text(text) => output.push_str(&escape(text)),
            Node::Raw(markup) => output.push_str(markup),
            Node::Image(node) => {
                output.push_str("<img src=\"");
                output.push_str(&escape(&node.image.src));
                output.push_str("\" alt=\"");
                output.push_str(&escape(&node.image.alt));
                output.push('"');
                if let Some(class) = &node.class {
                    output.push_str(" class=\"");
                    output.push_str(&escape(class));
                    output.push('"');
                }
                if node.lazy {
                    output.push_str(" loading=\"lazy\"");
                }
                output.push('>');
            }
            Node::Element(element) => {
                output.push('<');
                output.push_str(element.tag);
                for (name, value) in &element.attributes {
                    output.push(' ');
                    output.push_str(name);
                    output.push_str("=\"");
                    output.push_str(&escape(value));
                    output.push('"');
                }
                output.push('>');
                if VOID_ELEMENTS.contains(&element.tag) {
                    return;
                }
                for child in &element.children {
                    child.write_html(output);
                }
                output.push_str("</");
                output.push_str(element.tag);
                output.push('>');
            }
        }
    }

    fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a Node)) {
        visitor(self);
        if let Node::Element(element) = self {
            for child in &element.children {
                child.visit(visitor);
            }
        }
    }

    fn visit_mut(&mut self, visitor: &mut impl FnMut(&mut Node)) {
        visitor(self);
        if let Node::Element(element) = self {
            for child in &mut element.children {
                child.visit_mut(visitor);
            }
        }
    }
}

/// Output of composing one page: partial subtrees concatenated in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTree {
    pub route: String,
    pub nodes: Vec<Node>,
}

impl RenderedTree {
    pub fn new(route: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            route: route.into(),
            nodes,
        }
    }

    pub fn to_html(&self) -> String {
        let mut output = String::new();
        for node in &self.nodes {
            node.write_html(&mut output);
        }
        output
    }

    pub fn images(&self) -> Vec<&ImageRef> {
        let mut images = Vec::new();
        for node in &self.nodes {
            node.visit(&mut |visited| {
                if let Node::Image(image_node) = visited {
                    images.push(&image_node.image);
                }
            });
        }
        images
    }

    /// Replaces every image node with whatever `rewrite` returns for it.
    pub fn rewrite_images(&mut self, mut rewrite: impl FnMut(&ImageNode) -> Node) {
        for node in &mut self.nodes {
            node.visit_mut(&mut |visited| {
                if let Node::Image(image_node) = visited {
                    let replacement = rewrite(image_node);
                    *visited = replacement;
                }
            });
        }
    }

    /// Every class name used by element and image nodes, in first-seen order.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push_all = |classes: &str| {
            for name in classes.split_whitespace() {
                if !names.iter().any(|existing| existing == name) {
                    names.push(name.to_string());
                }
            }
        };
        for node in &self.nodes {
            node.visit(&mut |visited| match visited {
                Node::Element(element) => {
                    if let Some(classes) = element.get_attribute("class") {
                        push_all(classes);
                    }
                }
                Node::Image(image_node) => {
                    if let Some(classes) = &image_node.class {
                        push_all(classes);
                    }
                }
                Node::Text(_) | Node::Raw(_) => {}
            });
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> RenderedTree {
        let section = Element::new("section")
            .class("mx-auto max-w-screen-lg px-3 py-6")
            .child(Element::new("p").class("text-center").text("a < b"))
            .child(Node::image(
                ImageRef::new("/assets/images/avatar.svg", "Avatar image"),
                Some("h-80 w-64"),
            ));
        RenderedTree::new("/", vec![section.into()])
    }

    #[test]
    fn test_to_html_escapes_text() {
        let html = sample_tree().to_html();
        assert!(html.starts_with("<section class=\"mx-auto max-w-screen-lg px-3 py-6\">"));
        assert!(html.contains("<p class=\"text-center\">a &lt; b</p>"));
        assert!(html.contains(
            "<img src=\"/assets/images/avatar.svg\" alt=\"Avatar image\" class=\"h-80 w-64\" loading=\"lazy\">"
        ));
        assert!(html.ends_with("</section>"));
    }

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let mut output = String::new();
        Node::from(Element::new("source").attr("srcset", "/a.webp 320w")).write_html(&mut output);
        assert_eq!(output, "<source srcset=\"/a.webp 320w\">");
    }

    #[test]
    fn test_images_and_rewrite() {
        let mut tree = sample_tree();
        assert_eq!(tree.images().len(), 1);

        tree.rewrite_images(|node| Node::Raw(format!("<picture>{}</picture>", node.image.alt)));
        assert!(tree.images().is_empty());
        assert!(tree.to_html().contains("<picture>Avatar image</picture>"));
    }

    #[test]
    fn test_class_names_deduplicated() {
        let tree = RenderedTree::new(
            "/",
            vec![
                Element::new("div").class("flex gap-6").into(),
                Element::new("div").class("flex flex-col").into(),
            ],
        );
        assert_eq!(tree.class_names(), vec!["flex", "gap-6", "flex-col"]);
    }
}
