//! Element construction table
//!
//! Maps (namespace, local name) to the interface an element is created
//! with. The table is built once per process and shared by all documents.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::ns;

/// Interface an element is constructed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementInterface {
    /// Element outside the HTML and SVG namespaces
    Element,
    HtmlElement,
    HtmlUnknown,
    HtmlAnchor,
    HtmlApplet,
    HtmlArea,
    HtmlAudio,
    HtmlBase,
    HtmlBody,
    HtmlBr,
    HtmlButton,
    HtmlCanvas,
    HtmlData,
    HtmlDataList,
    HtmlDetails,
    HtmlDialog,
    HtmlDirectory,
    HtmlDiv,
    HtmlDList,
    HtmlEmbed,
    HtmlFieldSet,
    HtmlFont,
    HtmlForm,
    HtmlFrame,
    HtmlFrameSet,
    HtmlHeading,
    HtmlHead,
    HtmlHr,
    HtmlHtml,
    HtmlIFrame,
    HtmlImage,
    HtmlInput,
    HtmlLabel,
    HtmlLegend,
    HtmlLi,
    HtmlLink,
    HtmlMap,
    HtmlMarquee,
    HtmlMenu,
    HtmlMeta,
    HtmlMeter,
    HtmlMod,
    HtmlObject,
    HtmlOList,
    HtmlOptGroup,
    HtmlOption,
    HtmlOutput,
    HtmlParagraph,
    HtmlParam,
    HtmlPicture,
    HtmlPre,
    HtmlProgress,
    HtmlQuote,
    HtmlScript,
    HtmlSelect,
    HtmlSource,
    HtmlSpan,
    HtmlStyle,
    HtmlTableCaption,
    HtmlTableCell,
    HtmlTableCol,
    HtmlTable,
    HtmlTime,
    HtmlTitle,
    HtmlTableRow,
    HtmlTableSection,
    HtmlTemplate,
    HtmlTextArea,
    HtmlTrack,
    HtmlUList,
    HtmlVideo,
    SvgElement,
    SvgGraphics,
    SvgSvg,
}

const HTML_TAGS: &[(ElementInterface, &[&str])] = {
    use ElementInterface::*;
    &[
        (
            HtmlElement,
            &[
                "abbr", "acronym", "address", "article", "aside", "b", "basefont", "bdi", "bdo",
                "big", "center", "cite", "code", "dd", "dfn", "dt", "em", "figcaption", "figure",
                "footer", "header", "hgroup", "i", "kbd", "main", "mark", "nav", "nobr", "noembed",
                "noframes", "noscript", "plaintext", "rb", "rp", "rt", "rtc", "ruby", "s", "samp",
                "section", "small", "strike", "strong", "sub", "summary", "sup", "tt", "u", "var",
                "wbr",
            ],
        ),
        (HtmlAnchor, &["a"]),
        (HtmlApplet, &["applet"]),
        (HtmlArea, &["area"]),
        (HtmlAudio, &["audio"]),
        (HtmlBase, &["base"]),
        (HtmlBody, &["body"]),
        (HtmlBr, &["br"]),
        (HtmlButton, &["button"]),
        (HtmlCanvas, &["canvas"]),
        (HtmlData, &["data"]),
        (HtmlDataList, &["datalist"]),
        (HtmlDetails, &["details"]),
        (HtmlDialog, &["dialog"]),
        (HtmlDirectory, &["dir"]),
        (HtmlDiv, &["div"]),
        (HtmlDList, &["dl"]),
        (HtmlEmbed, &["embed"]),
        (HtmlFieldSet, &["fieldset"]),
        (HtmlFont, &["font"]),
        (HtmlForm, &["form"]),
        (HtmlFrame, &["frame"]),
        (HtmlFrameSet, &["frameset"]),
        (HtmlHeading, &["h1", "h2", "h3", "h4", "h5", "h6"]),
        (HtmlHead, &["head"]),
        (HtmlHr, &["hr"]),
        (HtmlHtml, &["html"]),
        (HtmlIFrame, &["iframe"]),
        (HtmlImage, &["img"]),
        (HtmlInput, &["input"]),
        (HtmlLabel, &["label"]),
        (HtmlLegend, &["legend"]),
        (HtmlLi, &["li"]),
        (HtmlLink, &["link"]),
        (HtmlMap, &["map"]),
        (HtmlMarquee, &["marquee"]),
        (HtmlMenu, &["menu"]),
        (HtmlMeta, &["meta"]),
        (HtmlMeter, &["meter"]),
        (HtmlMod, &["del", "ins"]),
        (HtmlObject, &["object"]),
        (HtmlOList, &["ol"]),
        (HtmlOptGroup, &["optgroup"]),
        (HtmlOption, &["option"]),
        (HtmlOutput, &["output"]),
        (HtmlParagraph, &["p"]),
        (HtmlParam, &["param"]),
        (HtmlPicture, &["picture"]),
        (HtmlPre, &["listing", "pre", "xmp"]),
        (HtmlProgress, &["progress"]),
        (HtmlQuote, &["blockquote", "q"]),
        (HtmlScript, &["script"]),
        (HtmlSelect, &["select"]),
        (HtmlSource, &["source"]),
        (HtmlSpan, &["span"]),
        (HtmlStyle, &["style"]),
        (HtmlTableCaption, &["caption"]),
        (HtmlTableCell, &["th", "td"]),
        (HtmlTableCol, &["col", "colgroup"]),
        (HtmlTable, &["table"]),
        (HtmlTime, &["time"]),
        (HtmlTitle, &["title"]),
        (HtmlTableRow, &["tr"]),
        (HtmlTableSection, &["thead", "tbody", "tfoot"]),
        (HtmlTemplate, &["template"]),
        (HtmlTextArea, &["textarea"]),
        (HtmlTrack, &["track"]),
        (HtmlUList, &["ul"]),
        (HtmlVideo, &["video"]),
    ]
};

const SVG_TAGS: &[(ElementInterface, &[&str])] = &[(ElementInterface::SvgSvg, &["svg"])];

impl ElementInterface {
    /// Interface name as exposed to scripts
    pub fn name(self) -> &'static str {
        use ElementInterface::*;
        match self {
            Element => "Element",
            HtmlElement => "HTMLElement",
            HtmlUnknown => "HTMLUnknownElement",
            HtmlAnchor => "HTMLAnchorElement",
            HtmlApplet => "HTMLAppletElement",
            HtmlArea => "HTMLAreaElement",
            HtmlAudio => "HTMLAudioElement",
            HtmlBase => "HTMLBaseElement",
            HtmlBody => "HTMLBodyElement",
            HtmlBr => "HTMLBRElement",
            HtmlButton => "HTMLButtonElement",
            HtmlCanvas => "HTMLCanvasElement",
            HtmlData => "HTMLDataElement",
            HtmlDataList => "HTMLDataListElement",
            HtmlDetails => "HTMLDetailsElement",
            HtmlDialog => "HTMLDialogElement",
            HtmlDirectory => "HTMLDirectoryElement",
            HtmlDiv => "HTMLDivElement",
            HtmlDList => "HTMLDListElement",
            HtmlEmbed => "HTMLEmbedElement",
            HtmlFieldSet => "HTMLFieldSetElement",
            HtmlFont => "HTMLFontElement",
            HtmlForm => "HTMLFormElement",
            HtmlFrame => "HTMLFrameElement",
            HtmlFrameSet => "HTMLFrameSetElement",
            HtmlHeading => "HTMLHeadingElement",
            HtmlHead => "HTMLHeadElement",
            HtmlHr => "HTMLHRElement",
            HtmlHtml => "HTMLHtmlElement",
            HtmlIFrame => "HTMLIFrameElement",
            HtmlImage => "HTMLImageElement",
            HtmlInput => "HTMLInputElement",
            HtmlLabel => "HTMLLabelElement",
            HtmlLegend => "HTMLLegendElement",
            HtmlLi => "HTMLLIElement",
            HtmlLink => "HTMLLinkElement",
            HtmlMap => "HTMLMapElement",
            HtmlMarquee => "HTMLMarqueeElement",
            HtmlMenu => "HTMLMenuElement",
            HtmlMeta => "HTMLMetaElement",
            HtmlMeter => "HTMLMeterElement",
            HtmlMod => "HTMLModElement",
            HtmlObject => "HTMLObjectElement",
            HtmlOList => "HTMLOListElement",
            HtmlOptGroup => "HTMLOptGroupElement",
            HtmlOption => "HTMLOptionElement",
            HtmlOutput => "HTMLOutputElement",
            HtmlParagraph => "HTMLParagraphElement",
            HtmlParam => "HTMLParamElement",
            HtmlPicture => "HTMLPictureElement",
            HtmlPre => "HTMLPreElement",
            HtmlProgress => "HTMLProgressElement",
            HtmlQuote => "HTMLQuoteElement",
            HtmlScript => "HTMLScriptElement",
            HtmlSelect => "HTMLSelectElement",
            HtmlSource => "HTMLSourceElement",
            HtmlSpan => "HTMLSpanElement",
            HtmlStyle => "HTMLStyleElement",
            HtmlTableCaption => "HTMLTableCaptionElement",
            HtmlTableCell => "HTMLTableCellElement",
            HtmlTableCol => "HTMLTableColElement",
            HtmlTable => "HTMLTableElement",
            HtmlTime => "HTMLTimeElement",
            HtmlTitle => "HTMLTitleElement",
            HtmlTableRow => "HTMLTableRowElement",
            HtmlTableSection => "HTMLTableSectionElement",
            HtmlTemplate => "HTMLTemplateElement",
            HtmlTextArea => "HTMLTextAreaElement",
            HtmlTrack => "HTMLTrackElement",
            HtmlUList => "HTMLUListElement",
            HtmlVideo => "HTMLVideoElement",
            SvgElement => "SVGElement",
            SvgGraphics => "SVGGraphicsElement",
            SvgSvg => "SVGSVGElement",
        }
    }

    /// Next interface up the inheritance chain
    pub fn parent(self) -> Option<ElementInterface> {
        use ElementInterface::*;
        match self {
            Element => None,
            HtmlElement | SvgElement => Some(Element),
            SvgSvg => Some(SvgGraphics),
            SvgGraphics => Some(SvgElement),
            _ => Some(HtmlElement),
        }
    }

    /// Inclusive ancestor chain, most derived first
    pub fn chain(self) -> impl Iterator<Item = ElementInterface> {
        std::iter::successors(Some(self), |i| i.parent())
    }

    /// Whether this is an HTML interface
    pub fn is_html(self) -> bool {
        self.chain().any(|i| i == ElementInterface::HtmlElement)
    }

    /// Whether this is an SVG interface
    pub fn is_svg(self) -> bool {
        self.chain().any(|i| i == ElementInterface::SvgElement)
    }
}

/// Per-namespace element construction table
#[derive(Debug)]
pub struct ElementRegistry {
    html: HashMap<&'static str, ElementInterface>,
    svg: HashMap<&'static str, ElementInterface>,
}

impl ElementRegistry {
    fn build() -> Self {
        let collect = |table: &[(ElementInterface, &'static [&'static str])]| {
            table
                .iter()
                .flat_map(|(interface, tags)| tags.iter().map(move |tag| (*tag, *interface)))
                .collect::<HashMap<_, _>>()
        };
        Self {
            html: collect(HTML_TAGS),
            svg: collect(SVG_TAGS),
        }
    }

    /// The process-wide table
    pub fn shared() -> &'static ElementRegistry {
        static REGISTRY: OnceLock<ElementRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::build)
    }

    /// Interface for an element with the given namespace and local name
    pub fn interface_for(&self, namespace: Option<&str>, local_name: &str) -> ElementInterface {
        match namespace {
            Some(ns::HTML) => self.html.get(local_name).copied().unwrap_or_else(|| {
                if is_custom_element_name(local_name) {
                    ElementInterface::HtmlElement
                } else {
                    ElementInterface::HtmlUnknown
                }
            }),
            Some(ns::SVG) => self
                .svg
                .get(local_name)
                .copied()
                .unwrap_or(ElementInterface::SvgElement),
            _ => ElementInterface::Element,
        }
    }

    /// Number of registered (namespace, tag) pairs
    pub fn len(&self) -> usize {
        self.html.len() + self.svg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Valid custom element name: lowercase ASCII start, contains a hyphen
fn is_custom_element_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase())
        && name.contains('-')
        && !name.chars().any(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_html_tags() {
        let registry = ElementRegistry::shared();
        assert_eq!(registry.interface_for(Some(ns::HTML), "div"), ElementInterface::HtmlDiv);
        assert_eq!(registry.interface_for(Some(ns::HTML), "td"), ElementInterface::HtmlTableCell);
        assert_eq!(registry.interface_for(Some(ns::HTML), "h4"), ElementInterface::HtmlHeading);
        assert_eq!(registry.interface_for(Some(ns::HTML), "em"), ElementInterface::HtmlElement);
    }

    #[test]
    fn test_unknown_and_custom_tags() {
        let registry = ElementRegistry::shared();
        assert_eq!(registry.interface_for(Some(ns::HTML), "blink"), ElementInterface::HtmlUnknown);
        assert_eq!(registry.interface_for(Some(ns::HTML), "my-widget"), ElementInterface::HtmlElement);
        assert_eq!(registry.interface_for(None, "div"), ElementInterface::Element);
    }

    #[test]
    fn test_svg_chain() {
        let registry = ElementRegistry::shared();
        let svg = registry.interface_for(Some(ns::SVG), "svg");
        assert_eq!(svg, ElementInterface::SvgSvg);
        assert!(svg.is_svg());
        assert!(!svg.is_html());
        assert_eq!(
            svg.chain().map(ElementInterface::name).collect::<Vec<_>>(),
            vec!["SVGSVGElement", "SVGGraphicsElement", "SVGElement", "Element"]
        );
        assert_eq!(registry.interface_for(Some(ns::SVG), "rect"), ElementInterface::SvgElement);
    }
}
