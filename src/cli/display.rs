// src/cli/display.rs

use crate::core::dispatcher::Outcome;
use crate::core::listing::{Listing, ListingEntry};
use colored::Colorize;
use std::fmt::Write;

/// Renders a listing as an indented tree: group headers, then their tasks.
pub fn render_listing(listing: &Listing) -> String {
    let mut out = String::new();

    if listing.entries.is_empty() {
        out.push_str("No tasks to list.\n");
    }

    for (i, entry) in listing.entries.iter().enumerate() {
        match entry {
            ListingEntry::Group {
                name,
                description,
                depth,
                ..
            } => {
                let indent = "   ".repeat(*depth);
                let header = format!("{}:", name).bold().green();
                let _ = match description {
                    Some(text) => writeln!(out, "{}{}  {}", indent, header, text.dimmed()),
                    None => writeln!(out, "{}{}", indent, header),
                };
            }
            ListingEntry::Task {
                name,
                aliases,
                summary,
                depth,
                important,
                hidden,
                ..
            } => {
                let is_last = !matches!(
                    listing.entries.get(i + 1),
                    Some(ListingEntry::Task { depth: next, .. }) if next == depth
                );
                let connector = if is_last { "└─" } else { "├─" };
                let indent = "   ".repeat(depth.saturating_sub(1));

                let mut line = format!("{}{} ", indent, connector);
                let styled = if *important {
                    name.cyan().bold()
                } else if *hidden {
                    name.dimmed()
                } else {
                    name.cyan()
                };
                let _ = write!(line, "{}", styled);
                if listing.show_aliases && !aliases.is_empty() {
                    let _ = write!(line, " ({})", aliases.join(", "));
                }
                if let Some(text) = summary {
                    let _ = write!(line, "  {}", text.dimmed());
                }
                out.push_str(&line);
                out.push('\n');
            }
        }
    }

    let hidden = listing.hidden_tasks + listing.hidden_in_groups;
    if hidden > 0 {
        let note = format!(
            "{} hidden task(s) not shown; use --all to list them.",
            hidden
        );
        let _ = writeln!(out, "\n{}", note.dimmed());
    }
    out
}

/// Prints what a dispatch produced. A task's `None` result prints nothing.
pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Listing(listing) => print!("{}", render_listing(listing)),
        Outcome::Help(text) => print!("{}", text),
        Outcome::Completed { value, .. } => {
            if !value.is_none() {
                println!("{}", value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupId;

    fn task(name: &str, depth: usize) -> ListingEntry {
        ListingEntry::Task {
            name: name.to_string(),
            aliases: vec![format!("{}-alias", name)],
            summary: None,
            usage: name.to_string(),
            depth,
            important: false,
            hidden: false,
        }
    }

    #[test]
    fn test_render_tree() {
        colored::control::set_override(false);
        let listing = Listing {
            entries: vec![
                ListingEntry::Group {
                    id: GroupId(0),
                    name: "default".into(),
                    full_name: "default".into(),
                    description: None,
                    depth: 0,
                },
                task("a", 1),
                task("b", 1),
                ListingEntry::Group {
                    id: GroupId(1),
                    name: "release".into(),
                    full_name: "release".into(),
                    description: Some("Ship it".into()),
                    depth: 0,
                },
                task("c", 1),
            ],
            hidden_tasks: 2,
            hidden_in_groups: 0,
            trace: Vec::new(),
            show_aliases: true,
        };
        let text = render_listing(&listing);
        let expected = "default:\n\
                        ├─ a (a-alias)\n\
                        └─ b (b-alias)\n\
                        release:  Ship it\n\
                        └─ c (c-alias)\n\
                        \n\
                        2 hidden task(s) not shown; use --all to list them.\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_listing() {
        colored::control::set_override(false);
        assert_eq!(render_listing(&Listing::default()), "No tasks to list.\n");
    }
}
