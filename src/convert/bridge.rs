//! HTML to structured-document bridge
//!
//! Re-parses the composed markup by its structural class markers into a
//! page/element tree and serializes it as JSON. This is a re-parse of the
//! persisted document, not a shared data structure, so the edit-save path
//! can regenerate it from arbitrary submitted HTML.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DocumentJson {
    pub document: DocumentPages,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DocumentPages {
    pub pages: Vec<PageJson>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PageJson {
    pub page_number: usize,
    pub elements: Vec<ElementJson>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementJson {
    Text { text: String, style: String },
    Image { style: String, src: String },
    Table { rows: Vec<Vec<CellJson>> },
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CellJson {
    pub text: String,
    pub rowspan: Option<String>,
    pub colspan: Option<String>,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid bridge selector")
}

/// Parse a composed document back into its page/element tree
///
/// Element order mirrors the composer's stacking order: text, then images,
/// then tables per page.
pub fn html_to_document(html: &str) -> DocumentJson {
    let doc = Html::parse_document(html);

    let page_sel = selector(".page-container");
    let text_sel = selector(".positioned-text");
    let image_sel = selector(".positioned-image img");
    let table_sel = selector("table");
    let tr_sel = selector("tr");
    let td_sel = selector("td");

    let mut pages = Vec::new();
    for (idx, page) in doc.select(&page_sel).enumerate() {
        let mut elements = Vec::new();

        for text in page.select(&text_sel) {
            elements.push(ElementJson::Text {
                text: text.text().collect(),
                style: attr(&text, "style"),
            });
        }

        for img in page.select(&image_sel) {
            let wrapper_style = img
                .parent()
                .and_then(ElementRef::wrap)
                .map(|parent| attr(&parent, "style"))
                .unwrap_or_default();
            elements.push(ElementJson::Image {
                style: wrapper_style,
                src: attr(&img, "src"),
            });
        }

        for table in page.select(&table_sel) {
            let rows = table
                .select(&tr_sel)
                .map(|tr| {
                    tr.select(&td_sel)
                        .map(|td| CellJson {
                            text: td.text().collect::<String>().trim().to_string(),
                            rowspan: td.value().attr("rowspan").map(str::to_string),
                            colspan: td.value().attr("colspan").map(str::to_string),
                        })
                        .collect()
                })
                .collect();
            elements.push(ElementJson::Table { rows });
        }

        pages.push(PageJson {
            page_number: idx + 1,
            elements,
        });
    }

    DocumentJson {
        document: DocumentPages { pages },
    }
}

fn attr(el: &ElementRef, name: &str) -> String {
    el.value().attr(name).unwrap_or_default().to_string()
}
