use anyhow::Result;
use pagecore::excerpt::{thumbnail_text, THUMBNAIL_LIMIT};
use pagecore::sanitize::sanitize_html;

use crate::document::Document;
use crate::engine::{HtmlEngine, RichTextEngine};
use crate::page::PageId;
use crate::settings::{MarginPreset, MarginSide};
use crate::snapshot::SnapshotManager;

pub const HELP: &str = "\
pages | page ID | add [MARKDOWN] | delete [ID]
type TEXT | enter | cursor BLOCK OFFSET | end | break
bold | italic | underline | strike | heading N | paragraph
show | import MARKDOWN | html RAW
header TEXT | footer TEXT | watermark TEXT|on|off
margin SIDE VALUE | margins narrow|normal|wide | zoom in|out|reset|N
settings | css
w NAME | e NAME | ls | rm NAME | q";

pub struct CommandProcessor {
    snapshots: SnapshotManager,
}

impl CommandProcessor {
    pub fn new(snapshots: SnapshotManager) -> Self {
        Self { snapshots }
    }

    pub async fn execute_command(
        &self,
        command: &str,
        document: &mut Document<HtmlEngine>,
        should_quit: &mut bool,
    ) -> Result<String> {
        let cmd = command.trim();
        let cmd = cmd.strip_prefix(':').unwrap_or(cmd);
        if cmd.is_empty() {
            return Ok(String::new());
        }

        let (name, rest) = match cmd.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (cmd, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        match name {
            "help" | "h" => Ok(HELP.to_string()),
            "pages" => Ok(list_pages(document)),
            "page" => {
                let id = parse_page_id(args.first().copied())?;
                document.switch_to_page(id)?;
                Ok(page_status(document))
            }
            "add" => {
                let content = (!rest.is_empty()).then(|| pagecore::to_html(rest));
                let id = document.add_page_with(content)?;
                Ok(format!("Added page {} ({})", id, page_status(document)))
            }
            "delete" | "del" => {
                let id = match args.first().copied() {
                    Some(arg) => parse_page_id(Some(arg))?,
                    None => document.current_page_id(),
                };
                if !document.can_delete_page() {
                    return Ok("Cannot delete the only page".to_string());
                }
                if !document.delete_page(id) {
                    return Err(anyhow::anyhow!("Page {} not found", id));
                }
                Ok(format!("Deleted page {} ({})", id, page_status(document)))
            }
            "type" => {
                if rest.is_empty() {
                    return Err(anyhow::anyhow!("Argument required"));
                }
                document.edit(|engine| engine.insert_text(rest));
                Ok(String::new())
            }
            "enter" => {
                document.edit(HtmlEngine::split_block);
                Ok(String::new())
            }
            "cursor" => {
                let [block, offset] = args.as_slice() else {
                    return Err(anyhow::anyhow!("Usage: cursor BLOCK OFFSET"));
                };
                let (block, offset) = (block.parse::<usize>()?, offset.parse::<usize>()?);
                document.edit(|engine| engine.set_cursor(block, offset));
                let cursor = document.engine().cursor();
                Ok(format!("Cursor at block {}, offset {}", cursor.block, cursor.offset))
            }
            "end" => {
                document.edit(HtmlEngine::move_to_end);
                Ok(String::new())
            }
            "break" => {
                document.insert_page_break()?;
                Ok("Page break inserted".to_string())
            }
            "bold" | "italic" | "underline" | "strike" => {
                let mark = match name {
                    "bold" => "strong",
                    "italic" => "em",
                    "underline" => "u",
                    _ => "s",
                };
                document.edit(|engine| engine.toggle_mark(mark));
                Ok(String::new())
            }
            "heading" => {
                let level: u8 = args.first().unwrap_or(&"1").parse()?;
                if !(1..=6).contains(&level) {
                    return Err(anyhow::anyhow!("Heading level must be 1-6"));
                }
                document.edit(|engine| engine.set_block_type(&format!("h{}", level)));
                Ok(String::new())
            }
            "paragraph" => {
                document.edit(|engine| engine.set_block_type("p"));
                Ok(String::new())
            }
            "show" => Ok(document.engine().serialized_content()),
            "import" => {
                let html = pagecore::to_html(rest);
                document.edit(|engine| engine.set_content(&html));
                Ok(format!("Imported into page {}", document.current_page_id()))
            }
            "html" => {
                let html = sanitize_html(rest);
                document.edit(|engine| engine.set_content(&html));
                Ok(format!("Replaced page {}", document.current_page_id()))
            }
            "header" => {
                let text = rest.to_string();
                document.update_settings(|s| s.header_text = text);
                Ok(format!("Header: {}", document.settings().header_text))
            }
            "footer" => {
                let text = rest.to_string();
                document.update_settings(|s| s.footer_text = text);
                Ok(format!("Footer: {}", document.settings().footer_text))
            }
            "watermark" => {
                match rest {
                    "on" => document.update_settings(|s| s.show_watermark = true),
                    "off" => document.update_settings(|s| s.show_watermark = false),
                    "" => document.update_settings(|s| s.toggle_watermark()),
                    text => {
                        let text = text.to_string();
                        document.update_settings(|s| s.watermark_text = text);
                    }
                }
                let settings = document.settings();
                Ok(format!(
                    "Watermark: {} ({})",
                    settings.watermark_text,
                    if settings.show_watermark { "shown" } else { "hidden" }
                ))
            }
            "margin" => {
                let [side, value] = args.as_slice() else {
                    return Err(anyhow::anyhow!("Usage: margin SIDE VALUE"));
                };
                let side: MarginSide = side.parse().map_err(anyhow::Error::msg)?;
                document.update_settings(|s| s.margins.set_from_input(side, value));
                Ok(format!(
                    "Margin {:?}: {}px",
                    side,
                    document.settings().margins.get(side)
                ))
            }
            "margins" => {
                let preset: MarginPreset = rest.parse().map_err(anyhow::Error::msg)?;
                document.update_settings(|s| s.apply_preset(preset));
                Ok(format!("Margins: {:?}", preset))
            }
            "zoom" => {
                match rest {
                    "in" | "+" => document.update_settings(|s| s.zoom_in()),
                    "out" | "-" => document.update_settings(|s| s.zoom_out()),
                    "reset" | "" => document.update_settings(|s| s.reset_zoom()),
                    value => {
                        let percent: u16 = value.trim_end_matches('%').parse()?;
                        let mut applied = false;
                        document.update_settings(|s| applied = s.set_zoom(percent));
                        if !applied {
                            return Err(anyhow::anyhow!("Unsupported zoom level {}%", percent));
                        }
                    }
                }
                Ok(format!("Zoom: {}", document.settings().zoom))
            }
            "settings" => Ok(describe_settings(document)),
            "css" => Ok(document
                .settings()
                .css_variables()
                .into_iter()
                .map(|(name, value)| format!("{}: {};", name, value))
                .collect::<Vec<_>>()
                .join("\n")),
            "w" => {
                let name = args
                    .first()
                    .ok_or_else(|| anyhow::anyhow!("No document name specified"))?;
                self.snapshots.save(name, &document.state()).await
            }
            "e" => {
                let name = args
                    .first()
                    .ok_or_else(|| anyhow::anyhow!("Argument required"))?;
                let snapshot = self.snapshots.load(name).await?;
                document.load_state(snapshot.state)?;
                Ok(format!("Opened '{}' ({})", name, page_status(document)))
            }
            "ls" => {
                let snapshots = self.snapshots.list().await?;
                if snapshots.is_empty() {
                    return Ok("No saved documents".to_string());
                }
                Ok(snapshots
                    .iter()
                    .map(|s| {
                        format!(
                            "{}  {} pages  {}",
                            s.name,
                            s.state.pages.len(),
                            s.modified_at.format("%Y-%m-%d %H:%M")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            "rm" => {
                let name = args
                    .first()
                    .ok_or_else(|| anyhow::anyhow!("Argument required"))?;
                self.snapshots.delete(name).await
            }
            "q" | "quit" => {
                *should_quit = true;
                Ok("Quitting".to_string())
            }
            _ => Err(anyhow::anyhow!("Unknown command: {}", name)),
        }
    }
}

fn parse_page_id(arg: Option<&str>) -> Result<PageId> {
    let arg = arg.ok_or_else(|| anyhow::anyhow!("Page id required"))?;
    let id = arg
        .parse::<u32>()
        .map_err(|_| anyhow::anyhow!("Invalid page id '{}'", arg))?;
    Ok(PageId(id))
}

/// "Page X of N", as shown in the header and footer.
pub fn page_status<E: RichTextEngine>(document: &Document<E>) -> String {
    format!(
        "Page {} of {}",
        document.current_page_number(),
        document.page_count()
    )
}

/// Sidebar listing: one line per page with a text excerpt.
pub fn list_pages<E: RichTextEngine>(document: &Document<E>) -> String {
    let current = document.current_page_id();
    document
        .pages()
        .iter()
        .enumerate()
        .map(|(index, page)| {
            format!(
                "{} {}. [{}] {}",
                if page.id == current { "*" } else { " " },
                index + 1,
                page.id,
                thumbnail_text(&page.content, THUMBNAIL_LIMIT)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_settings<E: RichTextEngine>(document: &Document<E>) -> String {
    let settings = document.settings();
    let margins = settings.margins;
    format!(
        "Header: {}\nFooter: {}\nWatermark: {} ({})\nMargins: {} {} {} {}\nZoom: {} (scale {:.2})",
        settings.header_text,
        settings.footer_text,
        settings.watermark_text,
        if settings.show_watermark { "shown" } else { "hidden" },
        margins.top,
        margins.right,
        margins.bottom,
        margins.left,
        settings.zoom,
        settings.zoom.scale()
    )
}
