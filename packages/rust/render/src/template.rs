//! Static page skeleton for the map.
//!
//! Placeholders are substituted by [`crate::render_map`]; every value is
//! escaped or JSON-encoded before it lands here.

pub(crate) const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{{TITLE}}</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/leaflet@1.9.4/dist/leaflet.css">
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css">
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/4.7.0/css/font-awesome.min.css">
  <script src="https://cdn.jsdelivr.net/npm/leaflet@1.9.4/dist/leaflet.js"></script>
  <script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.min.js"></script>
  <style>
    html, body { width: 100%; height: 100%; margin: 0; padding: 0; }
    #map { position: absolute; top: 0; bottom: 0; right: 0; left: 0; }
  </style>
</head>
<body>
  <div id="map"></div>
  <script>
    var map = L.map("map").setView([{{CENTER_LAT}}, {{CENTER_LON}}], {{ZOOM}});
    L.tileLayer({{TILE_URL}}, {
      attribution: {{TILE_ATTRIBUTION}},
      maxZoom: 19
    }).addTo(map);

    var icon = L.AwesomeMarkers.icon({
      icon: {{MARKER_ICON}},
      markerColor: {{MARKER_COLOR}},
      prefix: "fa"
    });

    var restaurants = {{MARKERS}};
    restaurants.forEach(function (r) {
      L.marker([r.lat, r.lon], { icon: icon })
        .bindPopup(r.popup, { maxWidth: 300 })
        .bindTooltip(r.tooltip)
        .addTo(map);
    });
  </script>
</body>
</html>
"#;
