//! 剪贴板读取（搜索框 / 评论框的 Ctrl+V）。
//!
//! - Desktop：`clipboard-arboard` 特性启用 arboard。
//! - Android：调用 Termux 的 `termux-clipboard-get`。

use anyhow::Result;

#[cfg(any(
    all(feature = "clipboard", target_os = "android"),
    all(
        feature = "clipboard",
        feature = "clipboard-arboard",
        not(target_os = "android")
    )
))]
use anyhow::Context;

/// 读取剪贴板并压成单行；空内容返回 `None`。
pub(super) fn paste_line() -> Result<Option<String>> {
    Ok(read_raw()?.and_then(|raw| single_line(&raw)))
}

/// 换行与制表符折成空格，去掉控制字符。
fn single_line(raw: &str) -> Option<String> {
    let line: String = raw
        .split(['\r', '\n', '\t'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    (!line.is_empty()).then_some(line)
}

#[cfg(all(feature = "clipboard", target_os = "android"))]
fn read_raw() -> Result<Option<String>> {
    use std::process::Command;

    let output = match Command::new("termux-clipboard-get").output() {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context("run termux-clipboard-get"),
    };
    if !output.status.success() {
        anyhow::bail!(
            "termux-clipboard-get exited with {}",
            output.status.code().unwrap_or(-1)
        );
    }
    Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
}

#[cfg(all(
    feature = "clipboard",
    feature = "clipboard-arboard",
    not(target_os = "android")
))]
fn read_raw() -> Result<Option<String>> {
    let mut clip = arboard::Clipboard::new().context("open clipboard")?;
    Ok(clip.get_text().ok())
}

#[cfg(any(
    not(feature = "clipboard"),
    all(not(target_os = "android"), not(feature = "clipboard-arboard"))
))]
fn read_raw() -> Result<Option<String>> {
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pasted_text_becomes_one_line() {
        assert_eq!(
            single_line("  one piece\r\n  chap 1100\t").as_deref(),
            Some("one piece chap 1100")
        );
        assert_eq!(single_line("\n \t\n"), None);
    }
}
