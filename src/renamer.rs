//! Scan-variant renaming.
//!
//! `virtualRender` walks a view's structure without running its side
//! effects. It is `render` with every structural runtime call swapped for a
//! `...Scan` counterpart. Content nested inside a `__followScan(...)` subtree
//! is evaluated later on its own, so calls inside it are switched back.

use crate::scanner;

/// `(call, scan counterpart)`, applied in order.
const SCAN_RENAMES: [(&str, &str); 21] = [
    ("App.View.renderView(", "App.View.scanRenderedView("),
    ("this.__includeif(", "this.__includeifScan("),
    ("this.__includewhen(", "this.__includewhenScan("),
    ("this.__include(", "this.__includeScan("),
    ("this.__extends(", "this.__extendsScan("),
    ("this.__showError(", "this.__showErrorScan("),
    ("App.View.section(", "this.__sectionScan("),
    ("this.__section(", "this.__sectionScan("),
    ("App.View.text(", "this.__textScan("),
    ("this.__text(", "this.__textScan("),
    ("this.subscribe(", "this.__subscribeScan("),
    ("this.__subscribe(", "this.__subscribeScan("),
    ("this.subscribeBlock(", "this.__subscribeBlockScan("),
    ("this.__subscribeBlock(", "this.__subscribeBlockScan("),
    ("this.useBlock(", "this.__useBlockScan("),
    ("this.__useBlock(", "this.__useBlockScan("),
    ("this.addBlock(", "this.__blockScan("),
    ("this.__block(", "this.__blockScan("),
    ("this.renderFollowingBlock(", "this.__followScan("),
    ("this.__follow(", "this.__followScan("),
    ("this.__addEventConfig(", "this.__addEventConfigScan("),
];

/// `(scan call, call)` used inside follow subtrees.
const FOLLOW_REVERTS: [(&str, &str); 12] = [
    ("App.View.scanRenderedView(", "App.View.renderView("),
    ("this.__includeifScan(", "this.__includeif("),
    ("this.__includewhenScan(", "this.__includewhen("),
    ("this.__includeScan(", "this.__include("),
    ("this.__sectionScan(", "this.__section("),
    ("this.__textScan(", "this.__text("),
    ("this.__subscribeScan(", "this.__subscribe("),
    ("this.__subscribeBlockScan(", "this.__subscribeBlock("),
    ("this.__useBlockScan(", "this.__useBlock("),
    ("this.__blockScan(", "this.__block("),
    ("this.__followScan(", "this.__follow("),
    ("this.__addEventConfigScan(", "this.__addEventConfig("),
];

const FOLLOW_OPEN: &str = "${this.__followScan(";

/// Produces the scan variant of compiled render code.
pub fn scan_variant(code: &str) -> String {
    let mut out = code.to_string();
    for (from, to) in SCAN_RENAMES {
        out = out.replace(from, to);
    }
    revert_follow_regions(&out)
}

fn revert_follow_regions(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut pos = 0;
    while let Some(found) = code[pos..].find(FOLLOW_OPEN) {
        let start = pos + found;
        let Some(span) = scanner::scan_balanced(code, start + 1) else {
            break;
        };
        let body_start = start + FOLLOW_OPEN.len();
        out.push_str(&code[pos..body_start]);
        out.push_str(&revert(&code[body_start..span.end()]));
        pos = span.end();
    }
    out.push_str(&code[pos..]);
    out
}

fn revert(region: &str) -> String {
    let mut out = region.to_string();
    for (from, to) in FOLLOW_REVERTS {
        out = out.replace(from, to);
    }
    out
}
