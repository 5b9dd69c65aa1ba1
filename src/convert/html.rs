//! Document assembly
//!
//! Wraps the composed page containers into the two deliverable documents:
//! the clean standalone replica persisted to disk, and the side-by-side
//! comparison view exposed as the job result.

/// Shared page styling, font faces first so families resolve
fn page_css(font_css: &str) -> String {
    format!(
        r#"{font_css}
.page-container {{
    position: relative;
    margin: 30px auto;
    background: white;
    border: 1px solid #ccc;
    box-shadow: 0 0 10px rgba(0,0,0,0.1);
    width: {width}px;
}}
.positioned-text {{
    position: absolute;
    white-space: pre;
    text-decoration: none;
}}
.positioned-text a {{
    color: blue;
    text-decoration: underline;
}}
.positioned-image {{
    position: absolute;
    object-fit: contain;
}}
.positioned-table {{
    position: absolute;
}}
table {{
    border-collapse: collapse;
    width: 100%;
    height: 100%;
}}
table td {{
    border: 1px solid #000;
    padding: 4px;
    vertical-align: top;
    font-size: 12px;
}}"#,
        font_css = font_css,
        width = crate::layout::TARGET_WIDTH as u32,
    )
}

/// The standalone replica written to disk and served for editing
pub fn clean_document(pages_html: &str, font_css: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Converted PDF</title>
<style>
{css}
body {{
    font-family: Arial, sans-serif;
    margin: 0;
    padding: 20px;
    background: #f5f5f5;
}}
</style>
</head>
<body>
{pages}
</body>
</html>
"#,
        css = page_css(font_css),
        pages = pages_html,
    )
}

/// Side-by-side comparison of the original PDF and the replica, with
/// proportional scroll sync between the panels
pub fn comparison_document(
    pages_html: &str,
    font_css: &str,
    pdf_base64: &str,
    page_count: usize,
    seconds: f64,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>PDF to HTML Comparison</title>
<style>
{css}
body {{
    font-family: Arial, sans-serif;
    margin: 0;
    padding: 0;
    background: #f5f5f5;
}}
.header {{
    padding: 15px;
    background-color: #2c3e50;
    color: white;
    text-align: center;
    font-size: 18px;
    font-weight: bold;
}}
.info-bar {{
    padding: 12px;
    font-size: 14px;
    background-color: #ecf0f1;
    border-bottom: 1px solid #bdc3c7;
    font-family: monospace;
    text-align: center;
}}
.comparison-container {{
    display: flex;
    height: calc(100vh - 120px);
}}
.pdf-panel, .html-panel {{
    width: 50%;
    border: 2px solid #34495e;
    overflow: auto;
}}
.panel-header {{
    background-color: #34495e;
    color: white;
    padding: 10px;
    text-align: center;
    font-weight: bold;
    position: sticky;
    top: 0;
    z-index: 100;
}}
.pdf-embed {{
    width: 100%;
    height: 800px;
    border: none;
}}
.html-content {{
    background: #eee;
    min-height: 100%;
}}
</style>
<script>
window.onload = () => {{
    const pdfPanel = document.querySelector('.pdf-panel');
    const htmlPanel = document.querySelector('.html-panel');
    let syncing = false;
    const link = (from, to) => from.addEventListener('scroll', () => {{
        if (syncing) return;
        syncing = true;
        const ratio = from.scrollTop / (from.scrollHeight - from.clientHeight);
        to.scrollTop = ratio * (to.scrollHeight - to.clientHeight);
        setTimeout(() => syncing = false, 50);
    }});
    link(pdfPanel, htmlPanel);
    link(htmlPanel, pdfPanel);
}};
</script>
</head>
<body>
<div class="header">PDF to HTML Conversion Comparison</div>
<div class="info-bar"><b>Conversion time:</b> {seconds:.2} seconds | <b>Pages:</b> {pages_count}</div>
<div class="comparison-container">
    <div class="pdf-panel">
        <div class="panel-header">Original PDF</div>
        <embed class="pdf-embed" src="data:application/pdf;base64,{pdf}" type="application/pdf" />
    </div>
    <div class="html-panel">
        <div class="panel-header">Converted HTML</div>
        <div class="html-content">
{pages}
        </div>
    </div>
</div>
</body>
</html>
"#,
        css = page_css(font_css),
        seconds = seconds,
        pages_count = page_count,
        pdf = pdf_base64,
        pages = pages_html,
    )
}

/// Minimal editor page: the persisted replica in a form that posts back
pub fn editor_document(job_id: &str, html_content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Edit Converted HTML</title>
<style>
body {{ font-family: Arial, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; }}
textarea {{ width: 100%; height: 80vh; font-family: monospace; font-size: 12px; }}
button {{ margin-top: 10px; padding: 8px 24px; }}
</style>
</head>
<body>
<h2>Editing job {job_id}</h2>
<form method="post" action="/edit/{job_id}">
<textarea name="edited_html">{content}</textarea>
<br>
<button type="submit">Save changes</button>
</form>
</body>
</html>
"#,
        job_id = job_id,
        content = html_escape::encode_text(html_content),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_document_embeds_pages_and_fonts() {
        let html = clean_document(
            r#"<div class="page-container" style="height: 100px;"></div>"#,
            "@font-face { font-family: 'X'; }",
        );
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("page-container"));
        assert!(html.contains("@font-face"));
        assert!(html.contains("width: 960px;"));
    }

    #[test]
    fn comparison_document_embeds_pdf_payload() {
        let html = comparison_document("<div></div>", "", "QUJD", 3, 1.234);
        assert!(html.contains("data:application/pdf;base64,QUJD"));
        assert!(html.contains("<b>Pages:</b> 3"));
        assert!(html.contains("1.23 seconds"));
    }

    #[test]
    fn editor_escapes_the_document() {
        let html = editor_document("abc", "<div>x</div>");
        assert!(html.contains("&lt;div&gt;x&lt;/div&gt;"));
        assert!(html.contains(r#"action="/edit/abc""#));
    }
}
