use crossbeam::channel::{Receiver, Sender, unbounded};

/// 鍵盤佇列：主機端推入，直譯器端取出 (FIFO)
#[derive(Debug, Clone)]
pub struct KeyQueue {
    tx: Sender<u16>,
    rx: Receiver<u16>,
}

impl Default for KeyQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, key: u16) {
        // tx 與 rx 同在一個結構內，不會斷線
        let _ = self.tx.send(key);
    }

    pub fn has_key(&self) -> bool {
        !self.rx.is_empty()
    }

    /// 沒有按鍵時回傳 0
    pub fn get_key(&self) -> u16 {
        self.rx.try_recv().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let keys = KeyQueue::new();
        assert!(!keys.has_key());
        keys.push(0x1C0D);
        keys.push(0x011B);
        assert!(keys.has_key());
        assert_eq!(keys.get_key(), 0x1C0D);
        assert_eq!(keys.get_key(), 0x011B);
        assert_eq!(keys.get_key(), 0);
    }

    #[test]
    fn test_shared_between_threads() {
        let keys = KeyQueue::new();
        let host = keys.clone();
        std::thread::spawn(move || {
            for k in 1..=100u16 {
                host.push(k);
            }
        })
        .join()
        .unwrap();
        let got: Vec<u16> = std::iter::from_fn(|| match keys.get_key() {
            0 => None,
            k => Some(k),
        })
        .collect();
        assert_eq!(got, (1..=100).collect::<Vec<_>>());
    }
}
