//! Tree transform chain.
//!
//! Passes run in a fixed order over a single owned [`Document`]:
//!
//! 1. heading ids
//! 2. image reference rewriting
//! 3. outline collection
//! 4. code decoration (diagram fences, language headers)
//! 5. syntax highlighting

mod code;
mod highlight;
mod media;
mod outline;
mod slug;

pub use outline::OutlineItem;
pub use slug::slugify;

use crate::options::RenderOptions;
use crate::tree::Document;

/// Run every pass and return the outline.
pub(crate) fn run(doc: &mut Document, options: &RenderOptions) -> Vec<OutlineItem> {
    slug::assign(doc);
    media::rewrite(doc, &options.assets);
    let outline = outline::collect(doc);
    code::decorate(doc);
    if options.highlight {
        highlight::apply(doc);
    }
    outline
}
