#![forbid(unsafe_code)]

//! HTML generation for the player pages.
//!
//! Rendering is a pure function of (id, mode, metadata): no network, no
//! storage, no clock. Both modes ship the same controller script; only the
//! surrounding markup differs. The script's tuning constants come from
//! [`crate::player`] so the browser behavior matches the tested state
//! machine.

use crate::metadata::VideoMetadata;
use crate::player::{
    self, PlaybackState, VolumeIcon, format_time,
};
use crate::validate::VideoId;

const EMBED_BASE: &str = "https://www.youtube-nocookie.com/embed";

/// Which page variant to render for a validated id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Video,
    Audio,
}

impl RenderMode {
    pub fn from_audio_flag(audio: bool) -> Self {
        if audio { Self::Audio } else { Self::Video }
    }

    pub fn is_audio(self) -> bool {
        matches!(self, Self::Audio)
    }
}

/// Opaque-iframe `src` contract. The player page drives its own transport, so
/// the embedded player's UI is fully suppressed; Audio mode additionally
/// hides in-video annotations.
pub fn embed_url(id: &VideoId, mode: RenderMode) -> String {
    let mut url = format!(
        "{EMBED_BASE}/{id}?enablejsapi=1&autoplay=0&controls=0&showinfo=0&rel=0&modestbranding=1"
    );
    if mode.is_audio() {
        url.push_str("&iv_load_policy=3");
    }
    url
}

/// Escapes text for splicing into HTML body text or attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Renders the complete player document for one request.
pub fn render_player_page(id: &VideoId, mode: RenderMode, metadata: &VideoMetadata) -> String {
    let title = escape_html(&metadata.title);
    let channel = escape_html(&metadata.channel_title);
    let body = match mode {
        RenderMode::Video => video_markup(id, mode),
        RenderMode::Audio => audio_markup(id, mode, metadata),
    };
    let script = controller_script(mode);

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title} - {channel}</title>\n\
         <link href=\"https://fonts.googleapis.com/icon?family=Material+Icons\" rel=\"stylesheet\">\n\
         <style>{STYLESHEET}</style>\n</head>\n<body>\n\
         <div class=\"player-container\">\n{body}\n</div>\n\
         <div class=\"player-notice\" hidden></div>\n\
         <script>{script}</script>\n</body>\n</html>\n"
    )
}

fn transport_controls(extra_class: &str) -> String {
    let initial = PlaybackState::new();
    let time_display = format!(
        "{} / {}",
        format_time(initial.current_time()),
        format_time(initial.duration())
    );
    let volume_glyph = VolumeIcon::for_volume(initial.volume()).glyph();
    format!(
        "<button class=\"control-btn{extra_class} play-toggle\" title=\"Play/Pause\">\
         <span class=\"material-icons\">play_arrow</span></button>\n\
         <button class=\"control-btn{extra_class} mute-toggle\" title=\"Mute\">\
         <span class=\"material-icons\">{volume_glyph}</span></button>\n\
         <div class=\"volume-slider\"><div class=\"volume-bar\"></div></div>\n\
         <div class=\"time-display\">{time_display}</div>\n\
         <div class=\"progress-track\"><div class=\"progress-bar\"></div></div>"
    )
}

fn video_markup(id: &VideoId, mode: RenderMode) -> String {
    let src = embed_url(id, mode);
    let controls = transport_controls("");
    format!(
        "<iframe class=\"player-iframe\" src=\"{src}\" allowfullscreen></iframe>\n\
         <div class=\"controls-overlay show\">\n<div class=\"controls\">\n{controls}\n\
         <button class=\"control-btn mode-toggle\" title=\"Audio mode\">\
         <span class=\"material-icons\">headphones</span></button>\n\
         <button class=\"control-btn pip-btn\" title=\"Picture-in-Picture\">\
         <span class=\"material-icons\">picture_in_picture_alt</span></button>\n\
         <button class=\"control-btn fullscreen-btn\" title=\"Fullscreen\">\
         <span class=\"material-icons\">fullscreen</span></button>\n\
         </div>\n</div>"
    )
}

fn audio_markup(id: &VideoId, mode: RenderMode, metadata: &VideoMetadata) -> String {
    let src = embed_url(id, mode);
    let title = escape_html(&metadata.title);
    let channel = escape_html(&metadata.channel_title);
    let thumbnail = escape_html(&metadata.thumbnail_url);
    let controls = transport_controls(" audio-size");
    format!(
        "<div class=\"audio-mode\">\n\
         <div class=\"audio-backdrop\" style=\"background-image:url('{thumbnail}')\"></div>\n\
         <iframe class=\"offscreen-iframe\" src=\"{src}\"></iframe>\n\
         <img class=\"audio-art\" src=\"{thumbnail}\" alt=\"Video thumbnail\">\n\
         <div class=\"audio-info\"><h1>{title}</h1><p>{channel}</p></div>\n\
         <div class=\"controls-overlay show\">\n<div class=\"controls\">\n{controls}\n\
         <button class=\"control-btn mode-toggle\" title=\"Video mode\">\
         <span class=\"material-icons\">videocam</span></button>\n\
         </div>\n</div>\n</div>"
    )
}

/// 200 page for `/`: how to address the server.
pub fn render_usage_page() -> String {
    info_page(
        "tubeframe",
        "Custom video playback pages.",
        "Open <code>/{video_id}</code> for the video player or \
         <code>/{video_id}/audio</code> for the audio-only player. \
         The id is the 10&ndash;11 character token from the source site.",
    )
}

/// 400 page: the path did not name a playable video.
pub fn render_bad_request_page() -> String {
    info_page(
        "Invalid URL",
        "That address does not look like a video page.",
        "Use <code>/{video_id}</code> or <code>/{video_id}/audio</code>, \
         where the id is 10&ndash;11 letters, digits, <code>-</code> or <code>_</code>.",
    )
}

/// 500 page: deliberately generic, details go to the log only.
pub fn render_internal_error_page() -> String {
    info_page(
        "Something went wrong",
        "The player page could not be produced.",
        "Try again in a moment.",
    )
}

fn info_page(title: &str, lead: &str, detail: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>{title}</title>\n<style>{INFO_STYLESHEET}</style>\n</head>\n<body>\n\
         <main><h1>{title}</h1><p class=\"lead\">{lead}</p><p>{detail}</p></main>\n\
         </body>\n</html>\n"
    )
}

/// The controller script, with the state-machine constants spliced in from
/// [`crate::player`]. Template placeholders are replaced rather than
/// `format!`-ed so the script can use braces freely.
fn controller_script(mode: RenderMode) -> String {
    CONTROLLER_SCRIPT
        .replace("__AUDIO_MODE__", if mode.is_audio() { "true" } else { "false" })
        .replace(
            "__DURATION__",
            &player::PLACEHOLDER_DURATION_SECONDS.to_string(),
        )
        .replace("__TICK_MS__", &player::TICK_INTERVAL_MS.to_string())
        .replace("__SEEK_STEP__", &player::SEEK_STEP_SECONDS.to_string())
        .replace("__VOLUME_STEP__", &player::VOLUME_STEP.to_string())
        .replace(
            "__SWIPE_THRESHOLD__",
            &player::SWIPE_THRESHOLD_PX.to_string(),
        )
        .replace(
            "__HIDE_AFTER_MS__",
            &player::HIDE_CONTROLS_AFTER_MS.to_string(),
        )
        .replace(
            "__DEFAULT_UNMUTE__",
            &player::DEFAULT_UNMUTE_VOLUME.to_string(),
        )
}

// Mirrors src/player.rs transition for transition; keep the two in sync.
const CONTROLLER_SCRIPT: &str = r#"'use strict';
(function () {
  var AUDIO_MODE = __AUDIO_MODE__;
  var TICK_MS = __TICK_MS__;
  var SEEK_STEP = __SEEK_STEP__;
  var VOLUME_STEP = __VOLUME_STEP__;
  var SWIPE_THRESHOLD = __SWIPE_THRESHOLD__;
  var HIDE_AFTER_MS = __HIDE_AFTER_MS__;
  var DEFAULT_UNMUTE = __DEFAULT_UNMUTE__;

  var state = {
    isPlaying: false,
    currentTime: 0,
    duration: __DURATION__,
    volume: 1,
    previousVolume: null
  };
  var clock = null;
  var hideTimer = null;

  function clamp(value, lo, hi) { return Math.min(hi, Math.max(lo, value)); }
  function q(selector) { return document.querySelector(selector); }

  function formatTime(seconds) {
    var total = Math.max(0, Math.floor(seconds));
    var minutes = Math.floor(total / 60);
    var rest = total % 60;
    return minutes + ':' + String(rest).padStart(2, '0');
  }

  function updateTransport() {
    var bar = q('.progress-bar');
    if (bar && state.duration > 0) {
      bar.style.width = clamp(state.currentTime / state.duration * 100, 0, 100) + '%';
    }
    var time = q('.time-display');
    if (time) {
      time.textContent = formatTime(state.currentTime) + ' / ' + formatTime(state.duration);
    }
    var playIcon = q('.play-toggle .material-icons');
    if (playIcon) { playIcon.textContent = state.isPlaying ? 'pause' : 'play_arrow'; }
  }

  function updateVolume() {
    var bar = q('.volume-bar');
    if (bar) { bar.style.width = (state.volume * 100) + '%'; }
    var icon = q('.mute-toggle .material-icons');
    if (icon) {
      icon.textContent = state.volume <= 0 ? 'volume_off'
        : state.volume < 0.5 ? 'volume_down' : 'volume_up';
    }
  }

  function notice(text) {
    var box = q('.player-notice');
    if (!box) { return; }
    box.textContent = text;
    box.hidden = false;
    setTimeout(function () { box.hidden = true; }, 4000);
  }

  function showControls() {
    var overlay = q('.controls-overlay');
    if (overlay) { overlay.classList.add('show'); }
    document.body.style.cursor = 'default';
    clearTimeout(hideTimer);
    hideTimer = setTimeout(function () {
      // Controls stay visible while paused.
      if (state.isPlaying && overlay) {
        overlay.classList.remove('show');
        document.body.style.cursor = 'none';
      }
    }, HIDE_AFTER_MS);
  }

  // The clock approximates playback locally; the iframe reports nothing back.
  function startClock() {
    stopClock();
    clock = setInterval(function () {
      if (state.isPlaying && state.currentTime < state.duration) {
        state.currentTime += 1;
        updateTransport();
      }
    }, TICK_MS);
  }

  function stopClock() {
    if (clock !== null) {
      clearInterval(clock);
      clock = null;
    }
  }

  function togglePlay() {
    state.isPlaying = !state.isPlaying;
    if (state.isPlaying) { startClock(); } else { stopClock(); }
    updateTransport();
    showControls();
  }

  function seek(delta) {
    state.currentTime = clamp(state.currentTime + delta, 0, state.duration);
    updateTransport();
    showControls();
  }

  function scrubTo(fraction) {
    state.currentTime = clamp(fraction, 0, 1) * state.duration;
    updateTransport();
    showControls();
  }

  function adjustVolume(delta) {
    state.volume = clamp(state.volume + delta, 0, 1);
    updateVolume();
    showControls();
  }

  function setVolumeFraction(fraction) {
    state.volume = clamp(fraction, 0, 1);
    updateVolume();
    showControls();
  }

  function toggleMute() {
    if (state.volume > 0) {
      state.previousVolume = state.volume;
      state.volume = 0;
    } else {
      state.volume = state.previousVolume !== null ? state.previousVolume : DEFAULT_UNMUTE;
      state.previousVolume = null;
    }
    updateVolume();
    showControls();
  }

  function toggleMode() {
    var path = window.location.pathname;
    window.location.href = AUDIO_MODE ? path.replace(/\/audio$/, '') : path + '/audio';
  }

  function toggleFullscreen() {
    if (!document.documentElement.requestFullscreen) {
      notice('Fullscreen is not supported by this browser');
      return;
    }
    if (document.fullscreenElement) {
      document.exitFullscreen();
    } else {
      document.documentElement.requestFullscreen();
    }
  }

  function togglePictureInPicture() {
    if (!('pictureInPictureEnabled' in document)) {
      notice('Picture-in-Picture is not supported by this browser');
      return;
    }
    // The embedded iframe exposes no <video> element to this document.
    notice('Picture-in-Picture is unavailable for the embedded player');
  }

  // Press-drag-release scrubbing on a horizontal track, for mouse and touch.
  function bindTrack(selector, apply) {
    var track = q(selector);
    if (!track) { return; }
    var dragging = false;
    function fractionAt(clientX) {
      var rect = track.getBoundingClientRect();
      if (rect.width <= 0) { return 0; }
      return clamp((clientX - rect.left) / rect.width, 0, 1);
    }
    function onMove(event) {
      if (!dragging) { return; }
      var x = event.touches ? event.touches[0].clientX : event.clientX;
      apply(fractionAt(x));
      event.preventDefault();
    }
    function onEnd() { dragging = false; }
    track.addEventListener('mousedown', function (event) {
      dragging = true;
      apply(fractionAt(event.clientX));
    });
    track.addEventListener('touchstart', function (event) {
      dragging = true;
      apply(fractionAt(event.touches[0].clientX));
    }, { passive: true });
    document.addEventListener('mousemove', onMove);
    document.addEventListener('touchmove', onMove, { passive: false });
    document.addEventListener('mouseup', onEnd);
    document.addEventListener('touchend', onEnd);
  }

  function bindButton(selector, handler) {
    var button = q(selector);
    if (button) { button.addEventListener('click', handler); }
  }

  document.addEventListener('keydown', function (event) {
    switch (event.code) {
      case 'Space': event.preventDefault(); togglePlay(); break;
      case 'ArrowLeft': event.preventDefault(); seek(-SEEK_STEP); break;
      case 'ArrowRight': event.preventDefault(); seek(SEEK_STEP); break;
      case 'ArrowUp': event.preventDefault(); adjustVolume(VOLUME_STEP); break;
      case 'ArrowDown': event.preventDefault(); adjustVolume(-VOLUME_STEP); break;
      case 'KeyM': event.preventDefault(); toggleMute(); break;
      case 'KeyF': event.preventDefault(); toggleFullscreen(); break;
    }
  });

  // Swipe gestures: the dominant axis must clear the threshold. Horizontal
  // swipes seek, vertical swipes change volume (down lowers it).
  var touchStartX = 0;
  var touchStartY = 0;
  document.addEventListener('touchstart', function (event) {
    touchStartX = event.touches[0].clientX;
    touchStartY = event.touches[0].clientY;
    showControls();
  }, { passive: true });
  document.addEventListener('touchmove', function (event) {
    if (event.target.closest('.progress-track, .volume-slider')) { return; }
    var x = event.touches[0].clientX;
    var y = event.touches[0].clientY;
    var deltaX = x - touchStartX;
    var deltaY = y - touchStartY;
    if (Math.abs(deltaX) > Math.abs(deltaY) && Math.abs(deltaX) > SWIPE_THRESHOLD) {
      seek(deltaX > 0 ? SEEK_STEP : -SEEK_STEP);
      touchStartX = x;
    } else if (Math.abs(deltaY) > Math.abs(deltaX) && Math.abs(deltaY) > SWIPE_THRESHOLD) {
      adjustVolume(deltaY > 0 ? -VOLUME_STEP : VOLUME_STEP);
      touchStartY = y;
    }
  }, { passive: true });

  document.addEventListener('mousemove', showControls);

  bindButton('.play-toggle', togglePlay);
  bindButton('.mute-toggle', toggleMute);
  bindButton('.mode-toggle', toggleMode);
  bindButton('.pip-btn', togglePictureInPicture);
  bindButton('.fullscreen-btn', toggleFullscreen);
  bindTrack('.progress-track', scrubTo);
  bindTrack('.volume-slider', setVolumeFraction);

  window.addEventListener('beforeunload', stopClock);

  updateTransport();
  updateVolume();
  showControls();
})();
"#;

const STYLESHEET: &str = "\
body{margin:0;padding:0;background:#000;overflow:hidden;\
font-family:'Segoe UI',Tahoma,Geneva,Verdana,sans-serif}\
.player-container{position:relative;width:100vw;height:100vh}\
.player-iframe{width:100%;height:100%;border:none}\
.offscreen-iframe{position:absolute;left:-9999px;width:1px;height:1px;border:none}\
.controls-overlay{position:absolute;left:0;right:0;bottom:0;padding:40px 0 0;\
background:linear-gradient(transparent,rgba(0,0,0,.8));opacity:0;\
transition:opacity .3s ease;pointer-events:none}\
.controls-overlay.show{opacity:1;pointer-events:all}\
.controls{display:flex;align-items:center;gap:15px;color:#fff;padding:0 20px 20px}\
.control-btn{background:rgba(255,255,255,.2);border:none;color:#fff;padding:8px;\
border-radius:50%;cursor:pointer;display:flex;align-items:center;justify-content:center}\
.control-btn:hover{background:rgba(255,255,255,.35)}\
.control-btn.audio-size{padding:14px}\
.progress-track{flex:1;height:4px;background:rgba(255,255,255,.3);\
border-radius:2px;cursor:pointer}\
.progress-bar{height:100%;background:#f00;border-radius:2px;width:0}\
.volume-slider{width:80px;height:4px;background:rgba(255,255,255,.3);\
border-radius:2px;cursor:pointer}\
.volume-bar{height:100%;background:#fff;border-radius:2px;width:100%}\
.time-display{font-size:14px;min-width:90px;text-align:center}\
.audio-mode{position:relative;display:flex;flex-direction:column;justify-content:center;\
align-items:center;text-align:center;width:100%;height:100%;overflow:hidden}\
.audio-backdrop{position:absolute;inset:0;background-size:cover;\
background-position:center;filter:blur(20px) brightness(.3)}\
.audio-art{width:300px;height:300px;border-radius:20px;object-fit:cover;\
box-shadow:0 20px 40px rgba(0,0,0,.5);margin-bottom:30px;z-index:1}\
.audio-info{z-index:1}\
.audio-info h1{color:#fff;font-size:2rem;font-weight:600;margin:0 0 10px;max-width:600px}\
.audio-info p{color:#ccc;font-size:1.2rem;margin:0 0 30px}\
.audio-mode .controls-overlay{position:static;background:rgba(0,0,0,.3);\
border-radius:50px;padding:0;z-index:1}\
.audio-mode .controls{padding:15px 25px}\
.player-notice{position:fixed;bottom:24px;left:50%;transform:translateX(-50%);\
background:rgba(0,0,0,.85);color:#fff;padding:10px 18px;border-radius:6px;\
font-size:14px;z-index:10}\
@media (max-width:768px){.controls{gap:10px;padding:0 10px 10px}\
.audio-art{width:250px;height:250px}.audio-info h1{font-size:1.5rem}}";

const INFO_STYLESHEET: &str = "\
body{margin:0;background:#111;color:#eee;\
font-family:'Segoe UI',Tahoma,Geneva,Verdana,sans-serif;display:flex;\
justify-content:center;align-items:center;min-height:100vh}\
main{max-width:540px;padding:24px}\
h1{font-size:1.6rem;margin:0 0 12px}\
.lead{color:#ccc}\
code{background:#222;padding:2px 6px;border-radius:4px}";
