//! 鼠标拖拽 → 翻页手势。

/// 水平位移达到该值才算滑动。
pub const SWIPE_THRESHOLD: i32 = 60;
/// 终端一列折算的位移单位。
pub const UNITS_PER_COLUMN: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// 按下后几乎没动，视为点击
    Tap,
    /// 向左滑：下一页
    SwipeLeft,
    /// 向右滑：上一页
    SwipeRight,
    /// 有移动但不足阈值
    None,
}

#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    start: Option<i32>,
}

impl DragTracker {
    pub fn press(&mut self, column: u16) {
        self.start = Some(i32::from(column) * UNITS_PER_COLUMN);
    }

    pub fn is_pressed(&self) -> bool {
        self.start.is_some()
    }

    /// 没有对应的按下事件时返回 `None`。
    pub fn release(&mut self, column: u16) -> Option<Gesture> {
        let start = self.start.take()?;
        Some(classify(i32::from(column) * UNITS_PER_COLUMN - start))
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }
}

/// `delta` 为终点减起点。
pub fn classify(delta: i32) -> Gesture {
    if delta == 0 {
        Gesture::Tap
    } else if delta <= -SWIPE_THRESHOLD {
        Gesture::SwipeLeft
    } else if delta >= SWIPE_THRESHOLD {
        Gesture::SwipeRight
    } else {
        Gesture::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(classify(-59), Gesture::None);
        assert_eq!(classify(59), Gesture::None);
        assert_eq!(classify(-60), Gesture::SwipeLeft);
        assert_eq!(classify(60), Gesture::SwipeRight);
        assert_eq!(classify(0), Gesture::Tap);
    }

    #[test]
    fn columns_convert_to_units() {
        let mut t = DragTracker::default();
        t.press(40);
        assert!(t.is_pressed());
        // 7 列 = 56 单位，不足阈值
        assert_eq!(t.release(33), Some(Gesture::None));

        t.press(40);
        assert_eq!(t.release(32), Some(Gesture::SwipeLeft));

        t.press(10);
        assert_eq!(t.release(20), Some(Gesture::SwipeRight));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut t = DragTracker::default();
        assert_eq!(t.release(5), None);
        t.press(5);
        t.cancel();
        assert_eq!(t.release(30), None);
    }

    #[test]
    fn click_is_tap() {
        let mut t = DragTracker::default();
        t.press(12);
        assert_eq!(t.release(12), Some(Gesture::Tap));
    }
}
