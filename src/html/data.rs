//! Static HTML vocabulary: elements, attributes and void elements.

/// Description of an HTML element.
#[derive(Debug, Clone, Copy)]
pub struct TagData {
    pub name: &'static str,
    pub description: &'static str,
    /// Attributes specific to this element, in addition to the global ones.
    pub attributes: &'static [&'static str],
}

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Attributes valid on every element.
pub const GLOBAL_ATTRIBUTES: &[(&str, &str)] = &[
    ("accesskey", "Provides a hint for generating a keyboard shortcut for the current element."),
    ("class", "A space-separated list of the classes of the element."),
    ("contenteditable", "Indicates whether the element should be editable by the user."),
    ("dir", "Indicates the directionality of the element's text."),
    ("draggable", "Indicates whether the element can be dragged."),
    ("hidden", "Indicates that the element is not yet, or is no longer, relevant."),
    ("id", "Defines a unique identifier which must be unique in the whole document."),
    ("lang", "Defines the language of the element."),
    ("style", "Contains CSS styling declarations to be applied to the element."),
    ("tabindex", "Indicates if the element can take input focus and in which order."),
    ("title", "Contains a text representing advisory information related to the element."),
    ("onclick", "Script run when the element is clicked."),
    ("onload", "Script run when the element has finished loading."),
    ("onchange", "Script run when the value of the element changes."),
    ("oninput", "Script run when the element gets user input."),
    ("onsubmit", "Script run when a form is submitted."),
    ("onkeydown", "Script run when a key is pressed."),
    ("onmouseover", "Script run when the pointer moves onto the element."),
];

/// Known elements.
pub const TAGS: &[TagData] = &[
    TagData {
        name: "a",
        description: "The a element represents a hyperlink.",
        attributes: &["href", "target", "download", "rel", "hreflang", "type"],
    },
    TagData {
        name: "abbr",
        description: "The abbr element represents an abbreviation or acronym.",
        attributes: &[],
    },
    TagData {
        name: "area",
        description: "The area element represents a hyperlink area on an image map.",
        attributes: &["alt", "coords", "shape", "href", "target"],
    },
    TagData {
        name: "article",
        description: "The article element represents a complete, or self-contained, composition.",
        attributes: &[],
    },
    TagData {
        name: "aside",
        description: "The aside element represents tangentially related content.",
        attributes: &[],
    },
    TagData {
        name: "audio",
        description: "The audio element represents a sound or audio stream.",
        attributes: &["src", "controls", "autoplay", "loop", "muted", "preload"],
    },
    TagData {
        name: "b",
        description: "The b element represents text drawn attention to.",
        attributes: &[],
    },
    TagData {
        name: "base",
        description: "The base element specifies the document base URL.",
        attributes: &["href", "target"],
    },
    TagData {
        name: "blockquote",
        description: "The blockquote element represents content quoted from another source.",
        attributes: &["cite"],
    },
    TagData {
        name: "body",
        description: "The body element represents the content of the document.",
        attributes: &["onload", "onunload"],
    },
    TagData { name: "br", description: "The br element represents a line break.", attributes: &[] },
    TagData {
        name: "button",
        description: "The button element represents a button labeled by its contents.",
        attributes: &["disabled", "form", "name", "type", "value"],
    },
    TagData {
        name: "canvas",
        description: "The canvas element provides scripts with a bitmap canvas.",
        attributes: &["width", "height"],
    },
    TagData {
        name: "code",
        description: "The code element represents a fragment of computer code.",
        attributes: &[],
    },
    TagData {
        name: "col",
        description: "The col element represents one or more columns in a column group.",
        attributes: &["span"],
    },
    TagData {
        name: "div",
        description: "The div element has no special meaning at all. It represents its children.",
        attributes: &[],
    },
    TagData {
        name: "em",
        description: "The em element represents stress emphasis of its contents.",
        attributes: &[],
    },
    TagData {
        name: "embed",
        description: "The embed element integrates an external application.",
        attributes: &["src", "type", "width", "height"],
    },
    TagData {
        name: "footer",
        description: "The footer element represents a footer for its section.",
        attributes: &[],
    },
    TagData {
        name: "form",
        description: "The form element represents a collection of form-associated elements.",
        attributes: &["action", "method", "enctype", "name", "target", "novalidate"],
    },
    TagData {
        name: "h1",
        description: "The h1 element represents a section heading.",
        attributes: &[],
    },
    TagData {
        name: "h2",
        description: "The h2 element represents a section heading.",
        attributes: &[],
    },
    TagData {
        name: "h3",
        description: "The h3 element represents a section heading.",
        attributes: &[],
    },
    TagData {
        name: "head",
        description: "The head element represents a collection of metadata for the Document.",
        attributes: &[],
    },
    TagData {
        name: "header",
        description: "The header element represents introductory content.",
        attributes: &[],
    },
    TagData {
        name: "hr",
        description: "The hr element represents a paragraph-level thematic break.",
        attributes: &[],
    },
    TagData {
        name: "html",
        description: "The html element represents the root of an HTML document.",
        attributes: &["manifest", "xmlns"],
    },
    TagData {
        name: "i",
        description: "The i element represents a span of text in an alternate voice or mood.",
        attributes: &[],
    },
    TagData {
        name: "iframe",
        description: "The iframe element represents a nested browsing context.",
        attributes: &["src", "srcdoc", "name", "sandbox", "allow", "width", "height"],
    },
    TagData {
        name: "img",
        description: "An img element represents an image.",
        attributes: &["alt", "src", "srcset", "width", "height", "loading"],
    },
    TagData {
        name: "input",
        description: "The input element represents a typed data field.",
        attributes: &["type", "name", "value", "placeholder", "checked", "disabled", "required"],
    },
    TagData {
        name: "label",
        description: "The label element represents a caption in a user interface.",
        attributes: &["for", "form"],
    },
    TagData {
        name: "li",
        description: "The li element represents a list item.",
        attributes: &["value"],
    },
    TagData {
        name: "link",
        description: "The link element allows authors to link their document to other resources.",
        attributes: &["href", "rel", "media", "type", "sizes"],
    },
    TagData {
        name: "main",
        description: "The main element represents the main content of the body of a document.",
        attributes: &[],
    },
    TagData {
        name: "meta",
        description: "The meta element represents various kinds of metadata.",
        attributes: &["name", "content", "charset", "http-equiv"],
    },
    TagData {
        name: "nav",
        description: "The nav element represents a section with navigation links.",
        attributes: &[],
    },
    TagData {
        name: "ol",
        description: "The ol element represents an ordered list of items.",
        attributes: &["reversed", "start", "type"],
    },
    TagData {
        name: "option",
        description: "The option element represents an option in a select element.",
        attributes: &["disabled", "label", "selected", "value"],
    },
    TagData { name: "p", description: "The p element represents a paragraph.", attributes: &[] },
    TagData {
        name: "pre",
        description: "The pre element represents a block of preformatted text.",
        attributes: &[],
    },
    TagData {
        name: "script",
        description: "The script element embeds dynamic script and data blocks.",
        attributes: &["src", "type", "async", "defer", "crossorigin", "integrity"],
    },
    TagData {
        name: "section",
        description: "The section element represents a generic section.",
        attributes: &[],
    },
    TagData {
        name: "select",
        description: "The select element represents a control for picking options.",
        attributes: &["disabled", "multiple", "name", "required", "size"],
    },
    TagData {
        name: "source",
        description: "The source element specifies an alternative media resource.",
        attributes: &["src", "type", "srcset", "media"],
    },
    TagData {
        name: "span",
        description: "The span element doesn't mean anything on its own.",
        attributes: &[],
    },
    TagData {
        name: "strong",
        description: "The strong element represents strong importance for its contents.",
        attributes: &[],
    },
    TagData {
        name: "style",
        description: "The style element embeds style information.",
        attributes: &["media", "type"],
    },
    TagData {
        name: "table",
        description: "The table element represents data with more than one dimension.",
        attributes: &[],
    },
    TagData {
        name: "tbody",
        description: "The tbody element represents a block of rows that consist of a body of data.",
        attributes: &[],
    },
    TagData {
        name: "td",
        description: "The td element represents a data cell in a table.",
        attributes: &["colspan", "rowspan", "headers"],
    },
    TagData {
        name: "template",
        description: "The template element declares cloneable HTML fragments.",
        attributes: &[],
    },
    TagData {
        name: "textarea",
        description: "The textarea element represents a multiline plain text edit control.",
        attributes: &["cols", "rows", "name", "placeholder", "disabled", "readonly", "required"],
    },
    TagData {
        name: "th",
        description: "The th element represents a header cell in a table.",
        attributes: &["colspan", "rowspan", "headers", "scope"],
    },
    TagData {
        name: "thead",
        description: "The thead element represents the column label rows.",
        attributes: &[],
    },
    TagData {
        name: "title",
        description: "The title element represents the document's title or name.",
        attributes: &[],
    },
    TagData {
        name: "tr",
        description: "The tr element represents a row of cells in a table.",
        attributes: &[],
    },
    TagData {
        name: "ul",
        description: "The ul element represents an unordered list of items.",
        attributes: &[],
    },
    TagData {
        name: "video",
        description: "The video element plays videos with optional captions.",
        attributes: &["src", "controls", "autoplay", "loop", "muted", "poster", "width", "height"],
    },
];

/// Look up an element by name, case-insensitively.
pub fn tag(name: &str) -> Option<&'static TagData> {
    TAGS.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

/// `true` for elements that never take an end tag.
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Description of a global attribute.
pub fn global_attribute(name: &str) -> Option<&'static str> {
    GLOBAL_ATTRIBUTES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, d)| *d)
}
