//! CSS property and color data.

pub struct PropertyData {
    pub name: &'static str,
    pub description: &'static str,
    pub values: &'static [&'static str],
}

const fn prop(
    name: &'static str,
    description: &'static str,
    values: &'static [&'static str],
) -> PropertyData {
    PropertyData {
        name,
        description,
        values,
    }
}

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];
const ALIGN: &[&str] = &[
    "normal", "stretch", "center", "start", "end", "flex-start", "flex-end", "baseline",
];
const JUSTIFY: &[&str] = &[
    "normal", "center", "start", "end", "flex-start", "flex-end", "left", "right",
    "space-between", "space-around", "space-evenly",
];
const OVERFLOW: &[&str] = &["visible", "hidden", "clip", "scroll", "auto"];
const SIZE: &[&str] = &["auto", "min-content", "max-content", "fit-content"];

/// Known properties, sorted by name.
pub static PROPERTIES: &[PropertyData] = &[
    prop("align-content", "Aligns a flex container's lines within the flex container.", ALIGN),
    prop("align-items", "Aligns flex items of the current flex line.", ALIGN),
    prop("align-self", "Aligns a single flex item, overriding align-items.", ALIGN),
    prop(
        "animation",
        "Shorthand for the animation properties.",
        &["none", "infinite", "alternate", "forwards", "backwards", "both"],
    ),
    prop(
        "background",
        "Shorthand for setting most background properties at the same place in the style sheet.",
        &["none", "no-repeat", "repeat", "fixed", "scroll", "center"],
    ),
    prop(
        "background-color",
        "Sets the background color of an element.",
        &["transparent", "currentColor"],
    ),
    prop(
        "background-image",
        "Sets the background image(s) of an element.",
        &["none", "url()", "linear-gradient()", "radial-gradient()"],
    ),
    prop(
        "background-position",
        "Specifies the initial position of the background image(s).",
        &["top", "right", "bottom", "left", "center"],
    ),
    prop(
        "background-repeat",
        "Specifies how background images are tiled.",
        &["repeat", "repeat-x", "repeat-y", "no-repeat", "space", "round"],
    ),
    prop(
        "background-size",
        "Specifies the size of the background images.",
        &["auto", "cover", "contain"],
    ),
    prop("border", "Shorthand property for setting border width, style, and color.", BORDER_STYLES),
    prop("border-bottom", "Shorthand property for setting the bottom border.", BORDER_STYLES),
    prop("border-collapse", "Selects a table's border model.", &["collapse", "separate"]),
    prop(
        "border-color",
        "The color of the border around all four edges of an element.",
        &["transparent", "currentColor"],
    ),
    prop("border-left", "Shorthand property for setting the left border.", BORDER_STYLES),
    prop("border-radius", "Defines the radii of the outer border edge.", &[]),
    prop("border-right", "Shorthand property for setting the right border.", BORDER_STYLES),
    prop("border-style", "The style of the border around edges of an element.", BORDER_STYLES),
    prop("border-top", "Shorthand property for setting the top border.", BORDER_STYLES),
    prop(
        "border-width",
        "Shorthand that sets the four border-*-width properties.",
        &["thin", "medium", "thick"],
    ),
    prop(
        "bottom",
        "Offset of a positioned box's bottom edge from its containing block.",
        &["auto"],
    ),
    prop("box-shadow", "Attaches one or more drop-shadows to the box.", &["none", "inset"]),
    prop(
        "box-sizing",
        "Specifies the behavior of the 'width' and 'height' properties.",
        &["content-box", "border-box"],
    ),
    prop(
        "clear",
        "Sides of the box that may not be adjacent to an earlier float.",
        &["none", "left", "right", "both"],
    ),
    prop("color", "Sets the color of an element's text.", &["currentColor", "transparent"]),
    prop("column-gap", "Sets the gap between columns.", &["normal"]),
    prop(
        "content",
        "Which page-based occurrence applies to a counter or string value.",
        &["none", "normal", "attr()", "counter()", "open-quote", "close-quote"],
    ),
    prop(
        "cursor",
        "Allows control over cursor appearance in an element.",
        &[
            "auto",
            "default",
            "pointer",
            "text",
            "move",
            "wait",
            "help",
            "not-allowed",
            "grab",
            "crosshair",
        ],
    ),
    prop(
        "display",
        "The type of box or boxes generated for an element.",
        &[
            "none",
            "block",
            "inline",
            "inline-block",
            "flex",
            "inline-flex",
            "grid",
            "inline-grid",
            "contents",
            "table",
            "list-item",
        ],
    ),
    prop("flex", "Specifies the components of a flexible length.", &["none", "auto"]),
    prop(
        "flex-direction",
        "Specifies how flex items are placed in the flex container.",
        &["row", "row-reverse", "column", "column-reverse"],
    ),
    prop("flex-grow", "Sets the flex grow factor.", &[]),
    prop("flex-shrink", "Sets the flex shrink factor.", &[]),
    prop(
        "flex-wrap",
        "Controls whether the flex container is single-line or multi-line.",
        &["nowrap", "wrap", "wrap-reverse"],
    ),
    prop(
        "float",
        "Specifies how a box should be floated.",
        &["none", "left", "right", "inline-start", "inline-end"],
    ),
    prop(
        "font",
        "Shorthand property for setting font properties.",
        &["caption", "icon", "menu", "message-box", "small-caption", "status-bar"],
    ),
    prop(
        "font-family",
        "Specifies a prioritized list of font family names or generic family names.",
        &["serif", "sans-serif", "monospace", "cursive", "fantasy", "system-ui"],
    ),
    prop(
        "font-size",
        "Indicates the desired height of glyphs from the font.",
        &[
            "xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large", "smaller",
            "larger",
        ],
    ),
    prop(
        "font-style",
        "Allows italic or oblique faces to be selected.",
        &["normal", "italic", "oblique"],
    ),
    prop(
        "font-weight",
        "Specifies weight of glyphs in the font.",
        &[
            "normal", "bold", "bolder", "lighter", "100", "200", "300", "400", "500", "600", "700",
            "800", "900",
        ],
    ),
    prop("gap", "Shorthand for row-gap and column-gap.", &["normal"]),
    prop(
        "grid-template-columns",
        "Specifies the track sizes of the grid columns.",
        &["none", "auto", "min-content", "max-content", "repeat()", "minmax()"],
    ),
    prop(
        "grid-template-rows",
        "Specifies the track sizes of the grid rows.",
        &["none", "auto", "min-content", "max-content", "repeat()", "minmax()"],
    ),
    prop("height", "Specifies the height of the content area of a box.", SIZE),
    prop(
        "justify-content",
        "Aligns flex items along the main axis of the current line of the flex container.",
        JUSTIFY,
    ),
    prop(
        "left",
        "Offset of a positioned box's left edge from its containing block.",
        &["auto"],
    ),
    prop(
        "letter-spacing",
        "Specifies the minimum, maximum, and optimal spacing between grapheme clusters.",
        &["normal"],
    ),
    prop(
        "line-height",
        "Determines the block-progression dimension of the text content area of an inline box.",
        &["normal"],
    ),
    prop(
        "list-style",
        "Shorthand for setting list-style-type, list-style-position and list-style-image.",
        &["none", "disc", "circle", "square", "decimal", "inside", "outside"],
    ),
    prop(
        "margin",
        "Shorthand property to set values for the thickness of the margin area.",
        &["auto"],
    ),
    prop(
        "margin-bottom",
        "Shorthand property to set values for the thickness of the bottom margin area.",
        &["auto"],
    ),
    prop(
        "margin-left",
        "Shorthand property to set values for the thickness of the left margin area.",
        &["auto"],
    ),
    prop(
        "margin-right",
        "Shorthand property to set values for the thickness of the right margin area.",
        &["auto"],
    ),
    prop(
        "margin-top",
        "Shorthand property to set values for the thickness of the top margin area.",
        &["auto"],
    ),
    prop(
        "max-height",
        "Allows authors to constrain content height to a certain range.",
        &["none", "min-content", "max-content", "fit-content"],
    ),
    prop(
        "max-width",
        "Allows authors to constrain content width to a certain range.",
        &["none", "min-content", "max-content", "fit-content"],
    ),
    prop("min-height", "Allows authors to constrain content height to a certain range.", SIZE),
    prop("min-width", "Allows authors to constrain content width to a certain range.", SIZE),
    prop(
        "opacity",
        "Opacity of an element's text, where 1 is opaque and 0 is entirely transparent.",
        &[],
    ),
    prop(
        "outline",
        "Shorthand property for 'outline-style', 'outline-width', and 'outline-color'.",
        BORDER_STYLES,
    ),
    prop("overflow", "Shorthand for setting 'overflow-x' and 'overflow-y'.", OVERFLOW),
    prop("overflow-x", "Specifies the handling of overflow in the horizontal direction.", OVERFLOW),
    prop("overflow-y", "Specifies the handling of overflow in the vertical direction.", OVERFLOW),
    prop("padding", "Shorthand property to set values for the thickness of the padding area.", &[]),
    prop(
        "padding-bottom",
        "Shorthand property to set values for the thickness of the bottom padding area.",
        &[],
    ),
    prop(
        "padding-left",
        "Shorthand property to set values for the thickness of the left padding area.",
        &[],
    ),
    prop(
        "padding-right",
        "Shorthand property to set values for the thickness of the right padding area.",
        &[],
    ),
    prop(
        "padding-top",
        "Shorthand property to set values for the thickness of the top padding area.",
        &[],
    ),
    prop(
        "pointer-events",
        "When an element can be the target of a pointer event.",
        &["auto", "none", "all", "visible", "fill", "stroke"],
    ),
    prop(
        "position",
        "The position CSS property sets how an element is positioned in a document.",
        &["static", "relative", "absolute", "fixed", "sticky"],
    ),
    prop(
        "right",
        "Offset of a positioned box's right edge from its containing block.",
        &["auto"],
    ),
    prop("row-gap", "Sets the gap between rows.", &["normal"]),
    prop(
        "text-align",
        "How inline contents of a block are horizontally aligned.",
        &["left", "right", "center", "justify", "start", "end"],
    ),
    prop(
        "text-decoration",
        "Decorations applied to font used for an element's text.",
        &["none", "underline", "overline", "line-through"],
    ),
    prop(
        "text-overflow",
        "Text can overflow for example when it is prevented from wrapping.",
        &["clip", "ellipsis"],
    ),
    prop(
        "text-transform",
        "Controls capitalization effects of an element's text.",
        &["none", "capitalize", "uppercase", "lowercase"],
    ),
    prop(
        "top",
        "Offset of a positioned box's top edge from its containing block.",
        &["auto"],
    ),
    prop(
        "transform",
        "Applies a 2D or 3D transformation to an element.",
        &["none", "translate()", "rotate()", "scale()", "matrix()", "skew()"],
    ),
    prop(
        "transition",
        "Shorthand property combines four of the transition properties into a single property.",
        &["none", "all", "ease", "ease-in", "ease-out", "ease-in-out", "linear"],
    ),
    prop(
        "vertical-align",
        "Vertical positioning of inline boxes inside a line box.",
        &["baseline", "sub", "super", "top", "text-top", "middle", "bottom", "text-bottom"],
    ),
    prop(
        "visibility",
        "Specifies whether the boxes generated by an element are rendered.",
        &["visible", "hidden", "collapse"],
    ),
    prop(
        "white-space",
        "Specifies how whitespace is handled in an element.",
        &["normal", "pre", "nowrap", "pre-wrap", "pre-line", "break-spaces"],
    ),
    prop(
        "width",
        "Specifies the width of the content area, padding area or border area of certain boxes.",
        SIZE,
    ),
    prop(
        "word-break",
        "Specifies line break opportunities for non-CJK scripts.",
        &["normal", "break-all", "keep-all", "break-word"],
    ),
    prop(
        "z-index",
        "Stack level of a positioned box in its stacking context.",
        &["auto"],
    ),
];

/// Values accepted by every property.
pub const GLOBAL_VALUES: &[&str] = &["inherit", "initial", "unset", "revert"];

/// At-rules offered in selector position.
pub const AT_RULES: &[&str] = &[
    "@charset",
    "@container",
    "@font-face",
    "@import",
    "@keyframes",
    "@layer",
    "@media",
    "@namespace",
    "@page",
    "@supports",
];

/// Named colors as (name, r, g, b).
pub static NAMED_COLORS: &[(&str, u8, u8, u8)] = &[
    ("aqua", 0, 255, 255),
    ("black", 0, 0, 0),
    ("blue", 0, 0, 255),
    ("brown", 165, 42, 42),
    ("coral", 255, 127, 80),
    ("crimson", 220, 20, 60),
    ("cyan", 0, 255, 255),
    ("fuchsia", 255, 0, 255),
    ("gold", 255, 215, 0),
    ("gray", 128, 128, 128),
    ("green", 0, 128, 0),
    ("grey", 128, 128, 128),
    ("indigo", 75, 0, 130),
    ("lime", 0, 255, 0),
    ("magenta", 255, 0, 255),
    ("maroon", 128, 0, 0),
    ("navy", 0, 0, 128),
    ("olive", 128, 128, 0),
    ("orange", 255, 165, 0),
    ("pink", 255, 192, 203),
    ("purple", 128, 0, 128),
    ("red", 255, 0, 0),
    ("silver", 192, 192, 192),
    ("teal", 0, 128, 128),
    ("tomato", 255, 99, 71),
    ("violet", 238, 130, 238),
    ("white", 255, 255, 255),
    ("yellow", 255, 255, 0),
];

/// Property data by (case-insensitive) name.
pub fn property(name: &str) -> Option<&'static PropertyData> {
    let name = name.to_ascii_lowercase();
    PROPERTIES
        .binary_search_by(|p| p.name.cmp(name.as_str()))
        .ok()
        .map(|i| &PROPERTIES[i])
}

pub fn named_color(name: &str) -> Option<(u8, u8, u8)> {
    let name = name.to_ascii_lowercase();
    NAMED_COLORS
        .binary_search_by(|(n, ..)| n.cmp(&name.as_str()))
        .ok()
        .map(|i| {
            let (_, r, g, b) = NAMED_COLORS[i];
            (r, g, b)
        })
}

/// `true` for properties whose value is (or starts with) a color.
pub fn takes_color(property: &str) -> bool {
    let property = property.to_ascii_lowercase();
    property == "color"
        || property.ends_with("-color")
        || matches!(
            property.as_str(),
            "background"
                | "border"
                | "border-top"
                | "border-right"
                | "border-bottom"
                | "border-left"
                | "outline"
                | "box-shadow"
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted() {
        assert!(PROPERTIES.windows(2).all(|w| w[0].name < w[1].name));
        assert!(NAMED_COLORS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn lookups() {
        assert_eq!(property("Color").map(|p| p.name), Some("color"));
        assert!(property("colour").is_none());
        assert_eq!(named_color("Red"), Some((255, 0, 0)));
        assert!(takes_color("background-color"));
        assert!(!takes_color("width"));
    }
}
