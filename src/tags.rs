//! Recognized HTML element names.
//!
//! [`Tag`] is the closed set bound elements are typed against. Names outside
//! the set are still accepted as [`ElementKind::Custom`].
use std::{fmt, str::FromStr};

macro_rules! tags {
    ($($variant:ident => $name:literal,)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Tag {
            $($variant,)+
        }

        impl Tag {
            pub const ALL: &'static [Tag] = &[$(Tag::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Tag::$variant => $name,)+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Tag::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

tags! {
    A => "a",
    Abbr => "abbr",
    Address => "address",
    Area => "area",
    Article => "article",
    Aside => "aside",
    Audio => "audio",
    B => "b",
    Base => "base",
    Bdi => "bdi",
    Bdo => "bdo",
    Big => "big",
    BlockQuote => "blockquote",
    Body => "body",
    Br => "br",
    Button => "button",
    Canvas => "canvas",
    Caption => "caption",
    Cite => "cite",
    Code => "code",
    Col => "col",
    ColGroup => "colgroup",
    Data => "data",
    DataList => "datalist",
    Dd => "dd",
    Del => "del",
    Details => "details",
    Dfn => "dfn",
    Dialog => "dialog",
    Div => "div",
    Dl => "dl",
    Dt => "dt",
    Em => "em",
    Embed => "embed",
    FieldSet => "fieldset",
    FigCaption => "figcaption",
    Figure => "figure",
    Footer => "footer",
    Form => "form",
    H1 => "h1",
    H2 => "h2",
    H3 => "h3",
    H4 => "h4",
    H5 => "h5",
    H6 => "h6",
    Head => "head",
    Header => "header",
    HGroup => "hgroup",
    Hr => "hr",
    Html => "html",
    I => "i",
    IFrame => "iframe",
    Img => "img",
    Input => "input",
    Ins => "ins",
    Kbd => "kbd",
    Keygen => "keygen",
    Label => "label",
    Legend => "legend",
    Li => "li",
    Link => "link",
    Main => "main",
    Map => "map",
    Mark => "mark",
    Menu => "menu",
    MenuItem => "menuitem",
    Meta => "meta",
    Meter => "meter",
    Nav => "nav",
    NoScript => "noscript",
    Object => "object",
    Ol => "ol",
    OptGroup => "optgroup",
    Option => "option",
    Output => "output",
    P => "p",
    Param => "param",
    Picture => "picture",
    Pre => "pre",
    Progress => "progress",
    Q => "q",
    Rp => "rp",
    Rt => "rt",
    Ruby => "ruby",
    S => "s",
    Samp => "samp",
    Script => "script",
    Section => "section",
    Select => "select",
    Small => "small",
    Source => "source",
    Span => "span",
    Strong => "strong",
    Style => "style",
    Sub => "sub",
    Summary => "summary",
    Sup => "sup",
    Table => "table",
    TBody => "tbody",
    Td => "td",
    TextArea => "textarea",
    TFoot => "tfoot",
    Th => "th",
    THead => "thead",
    Time => "time",
    Title => "title",
    Tr => "tr",
    Track => "track",
    U => "u",
    Ul => "ul",
    Var => "var",
    Video => "video",
    Wbr => "wbr",
    WebView => "webview",
}

impl Tag {
    pub fn is_form(&self) -> bool {
        matches!(self, Tag::Form)
    }

    pub fn is_button(&self) -> bool {
        matches!(self, Tag::Button)
    }

    /// Elements with no closing tag and no content.
    pub fn is_void(&self) -> bool {
        matches!(
            self,
            Tag::Area
                | Tag::Base
                | Tag::Br
                | Tag::Col
                | Tag::Embed
                | Tag::Hr
                | Tag::Img
                | Tag::Input
                | Tag::Keygen
                | Tag::Link
                | Tag::Meta
                | Tag::Param
                | Tag::Source
                | Tag::Track
                | Tag::Wbr
        )
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown element name: {0}")]
pub struct UnknownTag(pub String);

impl FromStr for Tag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::from_name(s).ok_or_else(|| UnknownTag(s.to_string()))
    }
}

/// What a bound element renders as: a known tag or any other element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Tag(Tag),
    Custom(String),
}

impl ElementKind {
    /// Resolve a name through the tag table; unknown names are kept verbatim.
    pub fn parse(name: &str) -> Self {
        match Tag::from_name(name) {
            Some(tag) => ElementKind::Tag(tag),
            None => ElementKind::Custom(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ElementKind::Tag(tag) => tag.as_str(),
            ElementKind::Custom(name) => name,
        }
    }

    pub fn tag(&self) -> Option<Tag> {
        match self {
            ElementKind::Tag(tag) => Some(*tag),
            ElementKind::Custom(_) => None,
        }
    }

    pub fn is_form(&self) -> bool {
        self.tag().is_some_and(|tag| tag.is_form())
    }

    pub fn is_button(&self) -> bool {
        self.tag().is_some_and(|tag| tag.is_button())
    }

    pub fn is_void(&self) -> bool {
        self.tag().is_some_and(|tag| tag.is_void())
    }
}

impl From<Tag> for ElementKind {
    fn from(tag: Tag) -> Self {
        ElementKind::Tag(tag)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
