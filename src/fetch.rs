pub mod open_weather_map;
