mod command_channel;
mod helpers;
mod lifecycle;
mod websocket;
