// ABOUTME: Fixture tests running the built-in SICP, T5D and Unsong profiles over typical page markup.
// ABOUTME: Locks in the exact cleaned fragments and next links each shipped profile produces.

use pretty_assertions::assert_eq;
use serial_chainer::cleanup::{self, CleanedChapter, PageContext};
use serial_chainer::extractors::{self, NextLink};
use serial_chainer::page::ParsedPage;
use serial_chainer::{load_builtin_registry, CompiledProfile};
use url::Url;

fn builtin(id: &str) -> CompiledProfile {
    let registry = load_builtin_registry().expect("builtin registry");
    let source = registry.get(id).expect("profile present").clone();
    CompiledProfile::compile(source).expect("compile")
}

fn run(
    profile: &CompiledProfile,
    url: &str,
    html: &str,
    is_first: bool,
    is_last: bool,
) -> (CleanedChapter, String, NextLink) {
    let page = ParsedPage::parse(Url::parse(url).unwrap(), html);
    let found = extractors::extract(&page, profile);
    let title = extractors::title_text(found.title.as_ref());
    let next = extractors::resolve_next(&page, profile);
    let cleaned = cleanup::clean(
        found.title,
        found.content,
        profile,
        &PageContext {
            url: page.url(),
            is_first,
            is_last,
        },
    );
    (cleaned, title, next)
}

const SICP_PAGE: &str = concat!(
    "<html><head><title>SICP</title></head><body>\n",
    r#"<div class="navigation">[Go to <a href="book.html">first</a>, <a href="book-Z-H-8.html">previous</a>, <a href="book-Z-H-10.html">next</a> page]</div>"#,
    "\n",
    r#"<h1><a href="book-Z-H-4.html#%_toc_%_chap_1">Chapter 1</a></h1>"#,
    "\n",
    r#"<p>See <a href="book-Z-H-10.html#%_sec_1.1">section 1.1</a> and <a href="http://example.com/x#y">this</a>.</p>"#,
    "\n",
    r#"<div><img src="ch1-Z-G-1.gif"></div>"#,
    "\n",
    r#"<div class="navigation">[Go to <a href="book-Z-H-10.html">next</a> page]</div>"#,
    "\n</body></html>"
);

const SICP_BOOK: &str = "https://mitpress.mit.edu/sites/default/files/sicp/full-text/book/";

#[test]
fn sicp_strips_navigation_and_rewrites_links() {
    let profile = builtin("SICP");
    let url = format!("{}book-Z-H-9.html", SICP_BOOK);
    let (cleaned, title, next) = run(&profile, &url, SICP_PAGE, false, false);

    assert_eq!(title, "Chapter 1");
    assert_eq!(next, NextLink::Follow(format!("{}book-Z-H-10.html", SICP_BOOK)));
    assert_eq!(
        cleaned.title_html,
        r##"<h1><a href="book-Z-H-4.html#%_toc_%_chap_1">Chapter 1</a></h1>"##
    );
    assert_eq!(
        cleaned.content_html,
        format!(
            concat!(
                "\n\n",
                r##"<h1><a href="#%_toc_%_chap_1">Chapter 1</a></h1>"##,
                "\n",
                r##"<p>See <a href="#%_sec_1.1">section 1.1</a> and <a href="http://example.com/x#y">this</a>.</p>"##,
                "\n",
                r#"<div><img src="{}ch1-Z-G-1.gif" /></div>"#,
                "\n\n"
            ),
            SICP_BOOK
        )
    );
}

#[test]
fn sicp_keeps_body_tags_only_at_chain_ends() {
    let profile = builtin("SICP");
    let url = format!("{}book-Z-H-9.html", SICP_BOOK);

    let (first, _, _) = run(&profile, &url, SICP_PAGE, true, false);
    assert!(first.content_html.starts_with("<body>\n\n<h1>"));
    assert!(!first.content_html.contains("</body>"));

    let (last, _, _) = run(&profile, &url, SICP_PAGE, false, true);
    assert!(!last.content_html.contains("<body>"));
    assert!(last.content_html.ends_with("</div>\n\n</body>"));
}

const T5D_PAGE: &str = concat!(
    "<html><head><title>T5D</title></head><body><article>",
    r#"<header><h1 class="entry-title">Chapter  One:  Waking</h1></header>"#,
    r#"<div class="entry-content"><p>“ Hello,”  she said. <i> Go</i></p><p>Wait…  what?</p>"#,
    r#"<div class="sharedaddy sd-sharing-enabled"><div class="robots-nocontent sd-block sd-social"><h3 class="sd-title">Share this:</h3></div></div>"#,
    r#"<div class="sharedaddy sd-block sd-like jetpack-likes-widget-wrapper jetpack-likes-widget-unloaded" id="like-post-wrapper-1"><h3 class="sd-title">Like this:</h3></div>"#,
    "</div>",
    r#"<nav class="nav-single"><span class="nav-next"><a href="https://thefifthdefiance.com/2015/11/09/chapter-two/" rel="next">Chapter Two</a></span></nav>"#,
    "</article></body></html>"
);

#[test]
fn t5d_removes_widgets_and_normalizes_whitespace() {
    let profile = builtin("T5D");
    let (cleaned, title, next) = run(
        &profile,
        "https://thefifthdefiance.com/2015/11/02/chapter-one/",
        T5D_PAGE,
        false,
        false,
    );

    assert_eq!(title, "Chapter One: Waking");
    assert_eq!(
        next,
        NextLink::Follow("https://thefifthdefiance.com/2015/11/09/chapter-two/".to_string())
    );
    assert_eq!(
        cleaned.title_html,
        r#"<h1 class="entry-title">Chapter One: Waking</h1>"#
    );
    assert_eq!(
        cleaned.content_html,
        r#"<div class="entry-content"><p>“Hello,” she said.<i> Go</i></p><p>Wait… what?</p></div>"#
    );
}

const UNSONG_PAGE: &str = concat!(
    "<html><head><title>Unsong</title></head><body>",
    r#"<h1 class="pjgm-posttitle">Chapter 2: Genesis</h1>"#,
    "<div class=\"pjgm-postcontent\">\n",
    r#"<p><a href="https://unsongbook.com/chapter-1/" rel="prev">Previous Chapter</a> <a href="https://unsongbook.com/chapter-3/" rel="next">Next Chapter</a></p>"#,
    "\n<p>Story text here.</p>\n",
    r#"<p><i>[If you like this story, please <a href="http://topwebfiction.com/vote.php?for=unsong">vote for it</a>, and I will keep spamming you with it every update.]</i></p>"#,
    "\n<hr>\n",
    r#"<p><i>Reminder: an <a href="https://unsongbook.com/authors-note-3/">Author’s Note</a> follows next week.</i></p>"#,
    "\n",
    r#"<div class="sharedaddy sd-sharing-enabled"><h3 class="sd-title">Share this:</h3></div>"#,
    "\n</div></body></html>"
);

#[test]
fn unsong_excises_announcements_and_navigation() {
    let profile = builtin("Unsong");
    let (cleaned, title, next) = run(
        &profile,
        "https://unsongbook.com/chapter-2-genesis/",
        UNSONG_PAGE,
        false,
        false,
    );

    assert_eq!(title, "Chapter 2: Genesis");
    assert!(!profile.is_notes(&title));
    assert_eq!(
        next,
        NextLink::Follow("https://unsongbook.com/chapter-3/".to_string())
    );
    assert_eq!(
        cleaned.title_html,
        r#"<h1 class="pjgm-posttitle">Chapter 2: Genesis</h1>"#
    );
    assert_eq!(
        cleaned.content_html,
        "<div class=\"pjgm-postcontent\">\n<p> </p>\n<p>Story text here.</p>\n\n\n\n</div>"
    );
}

#[test]
fn unsong_shortens_end_of_book_banner() {
    let profile = builtin("Unsong");
    let html = concat!(
        "<html><body><h1 class=\"pjgm-posttitle\">Chapter 20: The End</h1>",
        "<div class=\"pjgm-postcontent\">\n<p>The end.</p>\n<hr>\n",
        "<p></p><center><b>End of Book I<br>Thanks for reading</b></center>",
        "\n</div></body></html>"
    );
    let (cleaned, _, next) = run(
        &profile,
        "https://unsongbook.com/chapter-20/",
        html,
        false,
        true,
    );

    assert_eq!(next, NextLink::None);
    assert_eq!(
        cleaned.content_html,
        "<div class=\"pjgm-postcontent\">\n<p>The end.</p>\n<hr />\n<p></p><center><b>End of Book I</b></center>\n</div>"
    );
}

#[test]
fn unsong_classifies_notes_titles() {
    let profile = builtin("Unsong");
    assert!(profile.is_notes("Author’s Note 3: Thanks"));
    assert!(profile.is_notes("Author's Note 12"));
    assert!(profile.is_notes("Postscript"));
    assert!(!profile.is_notes("Interlude: Author's Note"));
}
