use crossterm::event::{self, Event as CEvent, KeyEvent};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

pub enum Event {
    Input(KeyEvent),
    Tick,
}

/// 在后台线程中轮询终端输入，并按固定间隔发送Tick
pub struct EventHandler {
    rx: mpsc::Receiver<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            if let Err(e) = Self::event_loop(&tx, tick_rate) {
                debug!("Input thread stopped: {}", e);
            }
        });

        EventHandler { rx }
    }

    /// 事件循环；接收端关闭或读终端失败时退出
    fn event_loop(tx: &mpsc::Sender<Event>, tick_rate: Duration) -> std::io::Result<()> {
        let mut last_tick = Instant::now();

        loop {
            let timeout = tick_rate.saturating_sub(last_tick.elapsed());

            if event::poll(timeout)? {
                if let CEvent::Key(key) = event::read()? {
                    if tx.send(Event::Input(key)).is_err() {
                        return Ok(());
                    }
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if tx.send(Event::Tick).is_err() {
                    return Ok(());
                }
                last_tick = Instant::now();
            }
        }
    }

    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }
}
