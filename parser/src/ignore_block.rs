use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use std::ops::Range;

/// Regions of a markdown document where `@login` text is not a mention:
/// code spans, code blocks, block quotes and raw HTML.
#[derive(Debug, Default)]
pub struct IgnoreBlocks {
    ranges: Vec<Range<usize>>,
}

impl IgnoreBlocks {
    pub fn new(text: &str) -> IgnoreBlocks {
        let mut ranges = Vec::new();
        let mut events = Parser::new(text).into_offset_iter();
        while let Some((event, range)) = events.next() {
            let end = match event {
                Event::Code(_) | Event::InlineHtml(_) => Some(range.end),
                Event::Start(Tag::CodeBlock(_)) => {
                    block_end(&mut events, |e| matches!(e, Event::End(TagEnd::CodeBlock)))
                }
                Event::Start(Tag::HtmlBlock) => {
                    block_end(&mut events, |e| matches!(e, Event::End(TagEnd::HtmlBlock)))
                }
                Event::Start(Tag::BlockQuote(_)) => quote_end(&mut events),
                _ => None,
            };
            if let Some(end) = end {
                ranges.push(range.start..end);
            }
        }

        IgnoreBlocks { ranges }
    }

    /// Whether `region` intersects any ignored range.
    pub fn overlaps(&self, region: Range<usize>) -> bool {
        self.ranges
            .iter()
            .any(|ignored| ignored.start < region.end && region.start < ignored.end)
    }
}

fn block_end<'a, I>(events: &mut I, is_end: impl Fn(&Event<'a>) -> bool) -> Option<usize>
where
    I: Iterator<Item = (Event<'a>, Range<usize>)>,
{
    events
        .find(|(event, _)| is_end(event))
        .map(|(_, range)| range.end)
}

// Block quotes nest, so count openings until the outermost one closes.
fn quote_end<'a, I>(events: &mut I) -> Option<usize>
where
    I: Iterator<Item = (Event<'a>, Range<usize>)>,
{
    let mut depth = 1;
    for (event, range) in events {
        match event {
            Event::Start(Tag::BlockQuote(_)) => depth += 1,
            Event::End(TagEnd::BlockQuote(_)) => {
                depth -= 1;
                if depth == 0 {
                    return Some(range.end);
                }
            }
            _ => {}
        }
    }
    None
}
