// SPDX-License-Identifier: MIT
//
// minui — interactive tour of the minui-term engine.
//
// A handful of demo pages, switched by number keys:
//
//   0 / h → help (this list)
//   1     → text effects, with default and fixed colors
//   2     → the 256-color palette
//   3 / 4 → HSV gradient as foreground / background color
//   5     → keyboard viewer: shows every decoded event
//   6     → API notes, rendered through formatted text
//
// Every page redraws from scratch on every event; the engine publishes
// one buffered frame per cycle, so switching pages and resizing stay
// flicker-free. Esc, q and Ctrl+C quit; a resize event rebuilds the
// grid for the new geometry.

use std::io;
use std::process;

use minui_term::cell::Style;
use minui_term::color::{Color, Effect};
use minui_term::event::Event;
use minui_term::format;
use minui_term::screen::{Alignment, Clip, Screen};

// ─── Pages ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Page {
    Welcome,
    TextEffects,
    Palette,
    GradientFg,
    GradientBg,
    Keyboard,
    Doc,
}

fn draw_welcome(screen: &mut Screen) -> &'static str {
    let style = screen.default_style();
    let lines = [
        "You can use the following keys to go through the demo:",
        "- Esc / q / Ctrl+C : quit the demo",
        "- 0 / h : this help screen",
        "- 1 : text effects",
        "- 2 : palette colors",
        "- 3 : HSV gradient foreground. Press any key to change the glyph.",
        "- 4 : HSV gradient background. Press any key to change the glyph.",
        "- 5 : keyboard / event viewer: shows the decoded events",
        "- 6 : API notes",
        "",
        "You can also resize the window at any moment to see the refresh.",
    ];
    for (i, text) in lines.iter().enumerate() {
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        screen.put_str(2 + i as i32, 0, text, style);
    }
    "minui demo"
}

fn draw_text_effects(screen: &mut Screen) -> &'static str {
    let samples = [
        ("Normal text", Effect::empty()),
        ("Bold text (may appear brighter)", Effect::BOLD),
        ("Italic text", Effect::ITALIC),
        ("Underline text", Effect::UNDERLINE),
        ("Blinking text", Effect::BLINK),
        ("Reversed-video text", Effect::REVERSE),
        ("Concealed text", Effect::CONCEAL),
        ("Crossed-out text", Effect::CROSSED_OUT),
    ];

    let mut line = 2;
    screen.put_str(line, 0, "With default colors:", screen.default_style());
    line += 1;
    for (text, effect) in samples {
        screen.put_str(line, 0, text, screen.default_style().with_effect(effect));
        line += 1;
    }

    line += 1;
    let fixed = Style::new(Color::from_palette(27), Color::from_palette(0));
    screen.put_str(line, 0, "With a fixed foreground color:", screen.default_style());
    line += 1;
    for (text, effect) in samples {
        screen.put_str(line, 0, text, fixed.with_effect(effect));
        line += 1;
    }
    "minui demo - text effects"
}

fn draw_palette(screen: &mut Screen) -> &'static str {
    const BLOCK: usize = 6;
    let white = Color::from_palette(15);
    let black = Color::from_palette(0);
    let bg = screen.default_style().bg;
    let label = |screen: &mut Screen, line: i32, column: usize, index: u16| {
        // Light text on the dark half of the palette, dark on the light.
        let fg = if index < 8 || (16..124).contains(&index) || (232..244).contains(&index) {
            white
        } else {
            black
        };
        #[allow(clippy::cast_possible_truncation)]
        let style = Style::new(fg, Color::from_palette(index as u8));
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        screen.put_str_n(
            line,
            (column * BLOCK) as i32,
            &index.to_string(),
            BLOCK,
            Alignment::Centered,
            Clip::End,
            style,
        );
    };

    let mut line = 2;
    screen.put_str(line, 0, "Standard and high-intensity colors", Style::new(white, bg));
    line += 1;
    for c in 0..8u16 {
        label(screen, line, c as usize, c);
        label(screen, line + 1, c as usize, 8 + c);
    }
    line += 3;

    screen.put_str(line, 0, "216 colors", Style::new(white, bg));
    line += 1;
    for row in 0..12u16 {
        for c in 0..18u16 {
            label(screen, line, c as usize, 16 + row * 18 + c);
        }
        line += 1;
    }
    line += 1;

    screen.put_str(line, 0, "24 grey shades", Style::new(white, bg));
    line += 1;
    for c in 0..12u16 {
        label(screen, line, c as usize, 232 + c);
        label(screen, line + 1, c as usize, 244 + c);
    }
    "minui demo - color palette"
}

#[allow(clippy::cast_precision_loss)]
fn draw_gradient(screen: &mut Screen, glyph: char, foreground: bool) -> &'static str {
    let width = i32::from(screen.width());
    let height = i32::from(screen.height());
    let hue_step = 360.0 / width.max(1) as f32;
    let value_step = 1.0 / (height - 2).max(1) as f32;
    let black = Color::from_rgb(0, 0, 0);

    for line in 1..height - 1 {
        for x in 0..width {
            let color = Color::from_hsv(
                x as f32 * hue_step,
                1.0,
                1.0 - (line - 1) as f32 * value_step,
            );
            let style = if foreground {
                Style::new(color, black)
            } else {
                Style::new(black, color)
            };
            screen.put_glyph(line, x, glyph, style);
        }
    }
    if foreground {
        "minui demo - HSV gradient (foreground)"
    } else {
        "minui demo - HSV gradient (background)"
    }
}

fn draw_keyboard(screen: &mut Screen, last_event: Event) -> &'static str {
    let style = screen.default_style();
    screen.put_str(
        2,
        0,
        "Press any key (or key combination) to see the decoded event.",
        style,
    );

    let description = match last_event {
        Event::SIG_INT => "signal SIGINT".to_string(),
        Event::SIG_TERM => "signal SIGTERM".to_string(),
        Event::RESIZE => "signal SIGWINCH (terminal resize)".to_string(),
        other => other.describe(),
    };
    screen.put_str(4, 0, &format!("Last event: {description}"), style);
    "minui demo - keyboard viewer"
}

fn draw_doc(screen: &mut Screen) -> &'static str {
    let text = "\
**Minimal usage**
- create a //Screen//
- draw with the //put_*// methods
- call //wait_for_event// to publish and wait for user interaction
- handle at least //CTRL_C//, //SIG_INT// and //SIG_TERM// to quit
- handle //RESIZE// by calling //reset// and redrawing

**Important calls**
- //put_glyph//: one character at a position, with explicit style
- //put_str//: a string growing to the right
- //put_str_n//: a fixed-width string with alignment and clipping
- //put_str_3//: left / middle / right fields in a fixed width
- //put_fstring//: formatted text switching colors and effects mid-line
- //wait_for_event//: publish the frame, then block for key or signal";

    let width = usize::from(screen.width());
    for (i, line) in format::from_markdown(text).iter().enumerate() {
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        screen.put_fstring(2 + i as i32, 0, line, width);
    }
    "minui demo - API notes"
}

// ─── Main loop ──────────────────────────────────────────────────────────────

fn run() -> io::Result<i32> {
    let mut screen = Screen::new()?;
    let mut page = Page::Welcome;
    let mut glyph = 'X';
    let mut last_event = Event::INVALID;

    loop {
        screen.reset();
        let title = match page {
            Page::Welcome => draw_welcome(&mut screen),
            Page::TextEffects => draw_text_effects(&mut screen),
            Page::Palette => draw_palette(&mut screen),
            Page::GradientFg => draw_gradient(&mut screen, glyph, true),
            Page::GradientBg => draw_gradient(&mut screen, glyph, false),
            Page::Keyboard => draw_keyboard(&mut screen, last_event),
            Page::Doc => draw_doc(&mut screen),
        };

        let width = usize::from(screen.width());
        let chrome = screen.default_style().with_effect(Effect::REVERSE);
        screen.put_str_n(0, 0, title, width, Alignment::Centered, Clip::End, chrome);
        screen.put_str_3(
            i32::from(screen.height()) - 1,
            0,
            " q / Ctrl+C to quit",
            "",
            "F1 / h for help ",
            width,
            chrome,
        );

        let event = screen.wait_for_event(-1)?;
        last_event = event;
        match event {
            Event::SIG_INT | Event::SIG_TERM | Event::CTRL_C | Event::ESCAPE => return Ok(0),
            Event::RESIZE => {}
            Event::F1 => page = Page::Welcome,
            other => match other.codepoint() {
                Some('q' | 'Q') => return Ok(0),
                Some('h' | 'H' | '0') => page = Page::Welcome,
                Some('1') => page = Page::TextEffects,
                Some('2') => page = Page::Palette,
                Some('3') => {
                    page = Page::GradientFg;
                    glyph = 'X';
                }
                Some('4') => {
                    page = Page::GradientBg;
                    glyph = 'X';
                }
                Some('5') => page = Page::Keyboard,
                Some('6') => page = Page::Doc,
                Some(c) if page == Page::GradientFg || page == Page::GradientBg => glyph = c,
                _ => {}
            },
        }
    }
}

fn main() {
    match run() {
        Ok(status) => process::exit(status),
        Err(err) => {
            eprintln!("minui: {err}");
            process::exit(1);
        }
    }
}
